//! Liveness endpoint
//!
//! Answers `200 OK` to any request. Shares no state with the
//! reconciliation loop.

use axum::{response::IntoResponse, Router};

pub fn router() -> Router {
    Router::new().fallback(health)
}

pub async fn health() -> impl IntoResponse {
    "OK"
}
