//! The `-v` flag. Repeating it raises verbosity; `ENROLL_LOG_LEVEL` accepts
//! either a count or a level name.

use clap::{builder::ValueParser, Arg, ArgAction, Command};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names in verbosity order; `error` is the default (no `-v`).
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Highest meaningful count; anything above it is clamped to `trace`.
const MAX_VERBOSITY: u8 = 4;

/// Parse a verbosity count or a level name into a count.
///
/// # Errors
/// Returns a message naming the accepted values.
pub fn parse_verbosity(value: &str) -> Result<u8, String> {
    let value = value.trim();

    if let Ok(count) = value.parse::<u8>() {
        return Ok(count.min(MAX_VERBOSITY));
    }

    (0u8..)
        .zip(LEVEL_NAMES)
        .find(|(_, name)| name.eq_ignore_ascii_case(value))
        .map(|(count, _)| count)
        .ok_or_else(|| {
            format!(
                "invalid log level, expected 0-4 or one of: {}",
                LEVEL_NAMES.join(", ")
            )
        })
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(parse_verbosity)
}

/// Level to filter at for a verbosity count; `None` keeps the subscriber default.
#[must_use]
pub const fn level(verbosity: u8) -> Option<Level> {
    match verbosity {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("ENROLL_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
