use crate::handlers::cache_ops::Endpoint;
use crate::models::{ErrorResponse, InvalidateResponse};
use crate::state::AppState;
use axum::{
    Json,
    extract::{MatchedPath, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, info};
use vakit::CacheKey;
use vakit::planes::control::operation::AdminOperations;

/// DELETE on any lookup path: drop the entry cached for the same path and query
pub async fn invalidate_entry(
    State(state): State<AppState>,
    matched: MatchedPath,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    let Some(endpoint) = Endpoint::from_path(matched.as_str()) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let request = match endpoint.request(&query) {
        Ok(request) => request,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response();
        }
    };
    let key = CacheKey::for_request(&request);
    info!("DELETE: path={}, key={}", endpoint.path(), key);

    match state.cache_aside.invalidate(&key).await {
        Ok(deleted) => Json(InvalidateResponse { deleted }).into_response(),
        Err(e) => {
            error!(key = %key, "invalidation failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new(e.to_string())),
            )
                .into_response()
        }
    }
}
