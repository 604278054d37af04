//! Spreadsheet export endpoint

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::export::{self, EXPORT_FILE_NAME, XLSX_CONTENT_TYPE};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// Comma-separated record ids; absent or empty exports everything
    pub ids: Option<String>,
}

/// GET /api/alumni/export?ids=1,2,3
pub async fn export_alumni(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<impl IntoResponse> {
    let ids = parse_ids(query.ids.as_deref().unwrap_or_default())?;
    let bytes = export::export_alumni(&state.store, &state.store, &ids).await?;

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
        ],
        bytes,
    ))
}

fn parse_ids(raw: &str) -> ApiResult<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| ApiError::BadRequest(format!("Invalid record id '{}'", s)))
        })
        .collect()
}
