//! REST API handlers

use super::AppState;
use crate::error::SearchError;
use crate::search::ScanStats;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Search query parameters
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// The word to look up
    #[serde(default)]
    pub word: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub index: ScanStats,
}

/// Handle `GET /files/search?word=...`
///
/// Responds with a JSON array of paths, or a JSON array of error messages
/// with 404 (word not indexed) or 500 (last scan failed).
pub async fn search_handler(
    State(searcher): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Response {
    let word = match params.word {
        Some(word) if !word.is_empty() => word,
        _ => {
            return (StatusCode::BAD_REQUEST, "Err: word parameter is required").into_response()
        }
    };

    // Blocks while a scan holds the generation lock.
    let outcome = tokio::task::spawn_blocking(move || searcher.search(&word)).await;

    match outcome {
        Ok(Ok(paths)) => (StatusCode::OK, Json(paths)).into_response(),
        Ok(Err(err @ SearchError::NotFound { .. })) => {
            (StatusCode::NOT_FOUND, Json(vec![err.to_string()])).into_response()
        }
        Ok(Err(SearchError::IndexUnreliable(errors))) => {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            (StatusCode::INTERNAL_SERVER_ERROR, Json(messages)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Search task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Err: search failed: {}", e),
            )
                .into_response()
        }
    }
}

/// Any method other than GET on the search route
pub async fn method_not_allowed() -> (StatusCode, &'static str) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        "Err: only GET method is allowed",
    )
}

/// Handle health check requests
pub async fn health_handler(
    State(searcher): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, String)> {
    let index = tokio::task::spawn_blocking(move || searcher.stats())
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to read index stats: {}", e),
            )
        })?;

    Ok(Json(HealthResponse {
        status: if index.errors == 0 { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        index,
    }))
}
