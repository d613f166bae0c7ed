use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::sesame::auth::StoreError;

/// Errors surfaced to HTTP clients as a status code and a plain-text body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("User already exists")]
    Conflict,
    #[error("Invalid username or password")]
    Unauthorized,
    #[error("Access denied")]
    Forbidden,
    #[error("404 page not found")]
    NotFound,
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(_) => Self::Conflict,
            // never reveal whether the username or the password was wrong
            StoreError::NotFound(_) => Self::Unauthorized,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            error!("{err:#}");
        }
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn status_and_body_mapping() {
        let cases = [
            (
                ApiError::BadRequest("bad json".to_string()),
                StatusCode::BAD_REQUEST,
                "bad json",
            ),
            (ApiError::Conflict, StatusCode::CONFLICT, "User already exists"),
            (
                ApiError::Unauthorized,
                StatusCode::UNAUTHORIZED,
                "Invalid username or password",
            ),
            (ApiError::Forbidden, StatusCode::FORBIDDEN, "Access denied"),
            (ApiError::NotFound, StatusCode::NOT_FOUND, "404 page not found"),
            (
                ApiError::Internal(anyhow!("disk on fire")),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
            ),
        ];

        for (err, status, body) in cases {
            assert_eq!(err.status(), status);
            assert_eq!(err.to_string(), body);
        }
    }

    #[test]
    fn store_errors_map_without_leaking_details() {
        let conflict: ApiError = StoreError::AlreadyExists("alice".to_string()).into();
        assert!(matches!(conflict, ApiError::Conflict));

        let missing: ApiError = StoreError::NotFound("alice".to_string()).into();
        assert!(matches!(missing, ApiError::Unauthorized));
        assert!(!missing.to_string().contains("alice"));
    }
}
