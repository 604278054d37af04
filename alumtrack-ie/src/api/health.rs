//! Health check endpoint

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::store::AlumniStore;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" when the database is unreachable
    pub status: String,
    pub module: String,
    pub version: String,
    pub git_hash: String,
    pub uptime_secs: u64,
    pub alumni_count: Option<i64>,
    /// Most recent batch-fatal import failure since startup
    pub last_import_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let alumni_count = match state.store.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(error = %e, "Health check database query failed");
            None
        }
    };

    Json(HealthResponse {
        status: if alumni_count.is_some() { "ok" } else { "degraded" }.to_string(),
        module: "alumtrack-ie".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        uptime_secs: state.startup_time.elapsed().as_secs(),
        alumni_count,
        last_import_error: state.last_import_failure(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
