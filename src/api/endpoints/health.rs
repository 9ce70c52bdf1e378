//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub active_sessions: usize,
    pub version: &'static str,
}

/// `GET /api/health` — connection check for clients and load balancers.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let database = ctx
        .core
        .with_db(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(|e| ApiError::Internal(e.to_string()))
        })
        .is_ok();

    let active_sessions = ctx.core.read_sessions()?.len();

    Ok(Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
        active_sessions,
        version: crate::config::APP_VERSION,
    }))
}
