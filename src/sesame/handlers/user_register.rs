use crate::sesame::{
    auth::{AuthState, User},
    error::ApiError,
    handlers::{parse_credentials, Credentials},
};
use anyhow::Context;
use axum::{body::Bytes, extract::Extension, http::StatusCode};
use std::sync::Arc;
use tokio::task;
use tracing::{debug, info, instrument};

#[utoipa::path(
    post,
    path = "/register",
    request_body = Credentials,
    responses (
        (status = 201, description = "Registration successful"),
        (status = 400, description = "Malformed JSON body or empty username", body = String, content_type = "text/plain"),
        (status = 409, description = "User with the specified username already exists", body = String, content_type = "text/plain"),
    ),
    tag = "register"
)]
// axum handler for register
#[instrument(skip_all)]
pub async fn register(
    auth: Extension<Arc<AuthState>>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let Credentials { username, password } = parse_credentials(&body)?;

    if username.is_empty() {
        return Err(ApiError::BadRequest(
            "Username must not be empty".to_string(),
        ));
    }

    // cheap early exit; the insert below re-checks under the write lock
    if auth.store().lookup(&username).is_ok() {
        debug!(%username, "User already exists");

        return Err(ApiError::Conflict);
    }

    let hasher = auth.hasher();
    let password_hash = task::spawn_blocking(move || hasher.hash(&password))
        .await
        .context("password hashing task failed")??;

    let role = auth.policy().role_for(&username);

    auth.store()
        .register(User::new(username.clone(), password_hash, role))
        .inspect_err(|_| debug!(%username, "User already exists"))?;

    info!(%username, %role, "User created");

    Ok(StatusCode::CREATED)
}
