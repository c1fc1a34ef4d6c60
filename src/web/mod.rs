//! HTTP API for word search

mod api;

use crate::search::Searcher;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use api::{HealthResponse, SearchQuery};

/// Shared application state
pub type AppState = Arc<Searcher>;

/// Create the router with all routes
pub fn create_router(searcher: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/files/search",
            get(api::search_handler).fallback(api::method_not_allowed),
        )
        .route("/api/health", get(api::health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(searcher)
}
