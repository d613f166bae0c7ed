use crate::sesame::{
    auth::{session::AUTHENTICATED, AuthState, Role, Session},
    error::ApiError,
    handlers::{parse_credentials, Credentials},
};
use anyhow::Context;
use axum::{
    body::Bytes,
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tokio::task;
use tracing::{debug, info, instrument, warn};

#[utoipa::path(
    post,
    path = "/login",
    request_body = Credentials,
    responses (
        (status = 200, description = "Login successful, admin accounts also receive a session cookie"),
        (status = 400, description = "Malformed JSON body", body = String, content_type = "text/plain"),
        (status = 401, description = "Invalid username or password", body = String, content_type = "text/plain"),
        (status = 500, description = "Session could not be saved", body = String, content_type = "text/plain"),
    ),
    tag = "login"
)]
// axum handler for login
#[instrument(skip_all)]
pub async fn login(
    auth: Extension<Arc<AuthState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let Credentials { username, password } = parse_credentials(&body)?;

    // a stale or forged cookie is replaced, not fatal
    let mut session = auth.cookies().load(&headers).unwrap_or_else(|e| {
        warn!("Discarding session cookie: {e}");

        Session::new()
    });

    // unknown usernames still pay for one Argon2 verification
    let (user, stored_hash) = match auth.store().lookup(&username) {
        Ok(user) => {
            let hash = user.password_hash().to_string();
            (Some(user), Some(hash))
        }
        Err(e) => {
            debug!("{e}");
            (None, None)
        }
    };

    let state = Arc::clone(&auth.0);
    let verified = task::spawn_blocking(move || match stored_hash {
        Some(hash) => state.hasher().verify(&password, &hash),
        None => {
            let _ = state.hasher().verify(&password, state.dummy_hash());
            Ok(false)
        }
    })
    .await
    .context("password verification task failed")??;

    let Some(user) = user.filter(|_| verified) else {
        warn!(%username, "User failed to login");

        return Err(ApiError::Unauthorized);
    };

    let mut response_headers = HeaderMap::new();

    if user.role() == Role::Admin {
        session.insert(AUTHENTICATED, true);

        let cookie = auth
            .cookies()
            .save(&session)
            .context("Error saving session")?;

        response_headers.insert(SET_COOKIE, cookie);

        debug!(%username, "Session established");
    }

    info!(%username, role = %user.role(), "User logged in");

    Ok((StatusCode::OK, response_headers).into_response())
}
