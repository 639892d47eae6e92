use std::io;

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogFormat, WrapperSettings, DEFAULT_LOG_FILTER};

/// Install the stderr subscriber. Stdout belongs to the wrapped tool.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(settings: &WrapperSettings) {
    let env_filter = EnvFilter::try_new(&settings.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match settings.log_format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(atty::is(atty::Stream::Stderr))
                    .with_writer(io::stderr),
            )
            .try_init(),
    };

    // Already installed (tests, embedding callers): keep the existing one.
    let _ = result;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent_and_tolerates_bad_filters() {
        init(&WrapperSettings {
            log_filter: "not a [valid filter".to_string(),
            log_format: LogFormat::Text,
        });
        init(&WrapperSettings::default());
        tracing::debug!("still alive");
    }
}
