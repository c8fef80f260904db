//! Health endpoint: liveness plus a database round trip.

use std::sync::Arc;

use axum::{Extension, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub open_registers: usize,
}

/// GET /health
pub async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<HealthResponse> {
    let database = state.db.health_check().await;
    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
        open_registers: state.registers.open_count(),
    })
}
