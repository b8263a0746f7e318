use axum::{Json, http::StatusCode};

use crate::models::{HealthResponse, UpResponse};

/// GET /health
pub async fn health_check() -> Result<Json<HealthResponse>, StatusCode> {
    Ok(Json(HealthResponse {
        message: "OK".into(),
    }))
}

/// GET|HEAD /up
pub async fn up() -> Json<UpResponse> {
    Json(UpResponse {
        status: "up".into(),
    })
}
