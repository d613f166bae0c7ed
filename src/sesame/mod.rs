#![allow(clippy::needless_for_each)]

use crate::sesame::{
    auth::AuthState,
    handlers::{
        admin, admin::__path_admin, login, register, serve, user_login::__path_login,
        user_register::__path_register, StaticFiles,
    },
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{any, post},
    Extension, Router,
};
use std::{future::Future, sync::Arc};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;

pub mod auth;
pub mod error;
pub mod handlers;


#[derive(OpenApi)]
#[openapi(
    paths(register, login, admin),
    components(schemas(handlers::Credentials)),
    tags(
        (name = "sesame", description = "Username/password authentication API")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Build the application router.
///
/// Both the trailing-slash and bare forms of each API path are served. Anything
/// unmatched falls through to the static file handler.
pub fn router(auth_state: Arc<AuthState>, files: Arc<StaticFiles>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/register/", post(register))
        .route("/login", post(login))
        .route("/login/", post(login))
        .route("/admin", any(admin))
        .route("/admin/", any(admin))
        .route("/admin/*rest", any(admin))
        .fallback(serve)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(auth_state))
                .layer(Extension(files)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, auth_state: Arc<AuthState>, files: Arc<StaticFiles>) -> Result<()> {
    let session = auth_state.cookies().config();
    info!(
        cookie = session.name(),
        max_age = session.max_age_seconds(),
        secure = session.secure(),
        "Session cookies configured"
    );

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Server is running on port {port}");

    serve_until(listener, auth_state, files, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves, then let
/// in-flight requests finish.
///
/// # Errors
/// Returns an error if accepting connections fails
pub async fn serve_until<F>(
    listener: TcpListener,
    auth_state: Arc<AuthState>,
    files: Arc<StaticFiles>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Serving static files from {}", files.root().display());

    let app = router(auth_state, files);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Gracefully shutdown");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
