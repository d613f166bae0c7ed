use axum::response::IntoResponse;
use tracing::{debug, instrument};

use crate::sesame::error::ApiError;

#[utoipa::path(
    get,
    path = "/admin/",
    responses (
        (status = 403, description = "The admin area is never served", body = String, content_type = "text/plain"),
    ),
    tag = "admin"
)]
// every method, every path under /admin
#[instrument]
pub async fn admin() -> impl IntoResponse {
    debug!("Rejecting admin request");

    ApiError::Forbidden
}
