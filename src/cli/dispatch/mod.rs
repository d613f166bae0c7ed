//! Map parsed arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{session, ARG_PORT, ARG_STATIC_DIR};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let static_dir = matches
        .get_one::<String>(ARG_STATIC_DIR)
        .map(PathBuf::from)
        .context("missing required argument: --static-dir")?;

    let session_opts = session::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        static_dir,
        session_key: session_opts.key,
        session_name: session_opts.name,
        session_max_age_seconds: session_opts.max_age_seconds,
        session_cookie_secure: session_opts.secure,
        admin_users: session_opts.admin_users,
    }))
}
