use crate::sesame::{
    self,
    auth::{AccessPolicy, AuthState, CookieStore, MemoryStore, SessionConfig},
    handlers::StaticFiles,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{path::PathBuf, sync::Arc};
use tracing::debug;

pub struct Args {
    pub port: u16,
    pub static_dir: PathBuf,
    pub session_key: SecretString,
    pub session_name: String,
    pub session_max_age_seconds: u64,
    pub session_cookie_secure: bool,
    pub admin_users: Vec<String>,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("static_dir", &self.static_dir)
            .field("session_key", &"[REDACTED]")
            .field("session_name", &self.session_name)
            .field("session_max_age_seconds", &self.session_max_age_seconds)
            .field("session_cookie_secure", &self.session_cookie_secure)
            .field("admin_users", &self.admin_users)
            .finish()
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the session key is rejected or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let session_config = SessionConfig::new()
        .with_name(args.session_name)
        .with_max_age_seconds(args.session_max_age_seconds)
        .with_secure(args.session_cookie_secure);

    let cookies =
        CookieStore::new(args.session_key, session_config).context("Invalid session configuration")?;

    let auth_state = AuthState::new(
        Arc::new(MemoryStore::new()),
        cookies,
        AccessPolicy::new(args.admin_users),
    );

    sesame::new(
        args.port,
        Arc::new(auth_state),
        Arc::new(StaticFiles::new(args.static_dir)),
    )
    .await
}
