//! Program administration endpoints

use alumtrack_common::Program;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::error::ApiResult;
use crate::store::ProgramStore;
use crate::AppState;

/// GET /api/programs
pub async fn list_programs(State(state): State<AppState>) -> ApiResult<Json<Vec<Program>>> {
    Ok(Json(state.store.list().await?))
}

/// DELETE /api/programs/:id
///
/// 409 while any alumni record still references the program.
pub async fn delete_program(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    state.store.delete(id).await?;
    tracing::info!(program_id = id, "Program deleted");
    Ok(StatusCode::NO_CONTENT)
}
