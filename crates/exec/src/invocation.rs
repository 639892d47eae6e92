use std::env;
use std::ffi::{OsStr, OsString};

/// Everything needed to launch one child: the executable, its arguments
/// (not including the executable itself) and its `NAME=VALUE` environment.
///
/// Entries are kept in insertion order. Empty arguments are preserved and
/// environment entries are not deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    executable: OsString,
    arguments: Vec<OsString>,
    environment: Vec<OsString>,
}

impl Invocation {
    /// Start an invocation with no arguments and an empty environment.
    pub fn new(executable: impl Into<OsString>) -> Self {
        Self {
            executable: executable.into(),
            arguments: Vec::new(),
            environment: Vec::new(),
        }
    }

    pub fn from_parts(
        executable: impl Into<OsString>,
        arguments: Vec<OsString>,
        environment: Vec<OsString>,
    ) -> Self {
        Self {
            executable: executable.into(),
            arguments,
            environment,
        }
    }

    pub fn arg(mut self, argument: impl Into<OsString>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    pub fn args<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.arguments.extend(arguments.into_iter().map(Into::into));
        self
    }

    /// Append a raw `NAME=VALUE` entry.
    pub fn env_entry(mut self, entry: impl Into<OsString>) -> Self {
        self.environment.push(entry.into());
        self
    }

    pub fn env(self, name: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env_entry(environment_entry(name.as_ref(), value.as_ref()))
    }

    pub fn envs<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.environment.extend(entries.into_iter().map(Into::into));
        self
    }

    /// Append the calling process's environment, in its own order.
    pub fn inherit_env(self) -> Self {
        self.envs(current_environment())
    }

    pub fn executable(&self) -> &OsStr {
        &self.executable
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.arguments
    }

    pub fn environment(&self) -> &[OsString] {
        &self.environment
    }
}

/// The calling process's environment as `NAME=VALUE` entries, in its own order.
pub fn current_environment() -> Vec<OsString> {
    env::vars_os()
        .map(|(name, value)| environment_entry(&name, &value))
        .collect()
}

/// Join one variable into a `NAME=VALUE` entry.
pub fn environment_entry(name: &OsStr, value: &OsStr) -> OsString {
    let mut entry = OsString::with_capacity(name.len() + value.len() + 1);
    entry.push(name);
    entry.push("=");
    entry.push(value);
    entry
}
