//! Map validated CLI arguments to the action the binary runs.

use crate::{
    api::session::DEFAULT_MAX_SESSIONS,
    cli::{
        actions::{server::Args, Action},
        commands::{
            ARG_DSN, ARG_PORT, ARG_PUBLIC_DIR, ARG_SERIALIZE_SIGNUPS, ARG_SESSION_COOKIE_SECURE,
            ARG_SESSION_MAX, ARG_SESSION_TTL_SECONDS,
        },
    },
};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(3000);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let public_dir = matches
        .get_one::<String>(ARG_PUBLIC_DIR)
        .map_or_else(|| PathBuf::from("public"), PathBuf::from);
    let session_ttl_seconds = matches
        .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
        .copied()
        .unwrap_or(604_800);
    let session_max = matches
        .get_one::<u64>(ARG_SESSION_MAX)
        .and_then(|max| usize::try_from(*max).ok())
        .unwrap_or(DEFAULT_MAX_SESSIONS);

    Ok(Action::Server(Args {
        port,
        dsn,
        public_dir,
        session_ttl_seconds,
        session_max,
        session_cookie_secure: matches.get_flag(ARG_SESSION_COOKIE_SECURE),
        serialize_signups: matches.get_flag(ARG_SERIALIZE_SIGNUPS),
    }))
}
