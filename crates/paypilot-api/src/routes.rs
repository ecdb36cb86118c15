//! Router setup and server startup.

use std::future::Future;
use std::net::SocketAddr;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use paypilot_core::PayPilotError;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Voice notes arrive inline as base64.
const BODY_LIMIT: usize = 16 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    let port = state.config.api.port;
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", port),
        format!("http://localhost:{}", port),
    ]
    .iter()
    .filter_map(|origin| origin.parse().ok())
    .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    let public_routes = Router::new().route("/health", get(handlers::health));

    let protected_routes = Router::new()
        .route("/inbound", post(handlers::inbound))
        .route("/invoices", get(handlers::list_invoices))
        .route("/contacts", put(handlers::upsert_contact))
        .route("/reminders/{job}/run", post(handlers::run_reminder))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_auth,
        ));

    public_routes
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API on `127.0.0.1:{api.port}` until `shutdown` resolves.
pub async fn start_server<F>(state: AppState, shutdown: F) -> Result<(), PayPilotError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([127, 0, 0, 1], state.config.api.port));
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
