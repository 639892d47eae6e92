//! Windows command line and environment block assembly
//!
//! `CreateProcessW` takes a single command line string that the child splits
//! back into `argv` with `CommandLineToArgvW` rules, and an environment block
//! of NUL-terminated `NAME=VALUE` entries ending in an extra NUL. Both are
//! built here as UTF-16 code units.
//!
//! The quoting follows the rules described in "Everyone quotes command line
//! arguments the wrong way": arguments without whitespace or quotes pass
//! through untouched, everything else is wrapped in quotes with backslash runs
//! doubled wherever they precede a quote.

use std::ffi::{OsStr, OsString};
use std::iter;

const NUL: u16 = 0;
const SPACE: u16 = b' ' as u16;
const QUOTE: u16 = b'"' as u16;
const BACKSLASH: u16 = b'\\' as u16;

/// Characters that force an argument to be quoted: space, tab, newline,
/// vertical tab and double quote.
const NEEDS_QUOTING: [u16; 5] = [SPACE, b'\t' as u16, b'\n' as u16, 0x0b, QUOTE];

/// Append `argument` to `command_line`, quoting it if required.
pub fn quote_argument(argument: &[u16], command_line: &mut Vec<u16>) {
    if !argument.is_empty() && !argument.iter().any(|unit| NEEDS_QUOTING.contains(unit)) {
        command_line.extend_from_slice(argument);
        return;
    }

    command_line.push(QUOTE);
    let mut backslashes = 0usize;
    for &unit in argument {
        if unit == BACKSLASH {
            backslashes += 1;
            continue;
        }
        let run = if unit == QUOTE {
            backslashes * 2 + 1
        } else {
            backslashes
        };
        command_line.extend(iter::repeat(BACKSLASH).take(run));
        command_line.push(unit);
        backslashes = 0;
    }
    // Protect the closing quote.
    command_line.extend(iter::repeat(BACKSLASH).take(backslashes * 2));
    command_line.push(QUOTE);
}

/// Build the full command line: the quoted executable followed by each quoted
/// argument, separated by single spaces. The result is not NUL-terminated.
pub fn command_line(executable: &OsStr, arguments: &[OsString]) -> Vec<u16> {
    let mut line = Vec::new();
    quote_argument(&to_wide(executable), &mut line);
    for argument in arguments {
        line.push(SPACE);
        quote_argument(&to_wide(argument), &mut line);
    }
    line
}

/// Encode `NAME=VALUE` entries as a double-NUL-terminated block.
///
/// An empty environment yields a block holding only the terminator.
pub fn environment_block(environment: &[OsString]) -> Vec<u16> {
    let mut block = Vec::new();
    for entry in environment {
        block.extend(to_wide(entry));
        block.push(NUL);
    }
    block.push(NUL);
    block
}

/// Split an environment block back into its entries.
///
/// Decoding stops at the first empty entry, which is the block terminator.
pub fn split_environment_block(block: &[u16]) -> Vec<OsString> {
    let mut entries = Vec::new();
    let mut rest = block;
    while let Some(end) = rest.iter().position(|&unit| unit == NUL) {
        if end == 0 {
            break;
        }
        entries.push(from_wide(&rest[..end]));
        rest = &rest[end + 1..];
    }
    entries
}

#[cfg(windows)]
pub(crate) fn to_wide(value: &OsStr) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;
    value.encode_wide().collect()
}

#[cfg(not(windows))]
pub(crate) fn to_wide(value: &OsStr) -> Vec<u16> {
    value.to_string_lossy().encode_utf16().collect()
}

#[cfg(windows)]
fn from_wide(units: &[u16]) -> OsString {
    use std::os::windows::ffi::OsStringExt;
    OsString::from_wide(units)
}

#[cfg(not(windows))]
fn from_wide(units: &[u16]) -> OsString {
    OsString::from(String::from_utf16_lossy(units))
}
