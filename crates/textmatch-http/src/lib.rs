//! HTTP adapter for the text match service, plus the forwarding gateway.
//!
//! JSON shaping lives here only; the service layer deals in typed units.

pub mod error;
pub mod gateway;
pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use textmatch_service::TextMatchService;

pub use error::ApiError;

pub type AppState = Arc<TextMatchService>;

pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/insert", post(handlers::insert))
        .route("/search", get(handlers::search))
        .route("/get", get(handlers::paragraph))
        .route("/health", get(handlers::health))
        .with_state(service)
}

/// Bind and serve until the process is stopped.
pub async fn serve(service: AppState, bind_addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, index = service.index_name(), "listening");
    axum::serve(listener, router(service)).await?;
    Ok(())
}
