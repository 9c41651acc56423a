//! LMS Diagnostics API /v1: local HTTP sidecar for the host process
pub mod handlers;
pub mod metrics;
pub mod middleware;

pub use handlers::{ApiError, AppState};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use lmsdiag_engine::AnalysisOptions;
use tower_http::trace::TraceLayer;

/// Default listen address; the sidecar only serves the local host
pub const DEFAULT_ADDR: &str = "127.0.0.1:8788";

/// Largest request body accepted, sized for exported course packages
pub const MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/v1/analyze", post(handlers::analyze))
        .route("/v1/analyze/har", post(handlers::analyze_har))
        .route("/v1/analyze/package", post(handlers::analyze_package))
        .route("/v1/profiles", get(handlers::list_profiles))
        .route("/v1/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .layer(middleware::cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(addr: &str, options: AnalysisOptions) -> anyhow::Result<()> {
    let app = create_app(AppState::new(options)?);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("LMS diagnostics sidecar listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
