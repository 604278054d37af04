//! Bulk import endpoint

use axum::extract::multipart::{Multipart, MultipartError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::import::{decode, ReconciliationEngine, RowValidator, SpreadsheetFormat};
use crate::AppState;

/// Multipart field carrying the spreadsheet
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub batch_id: Uuid,
    pub imported: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub message: String,
    /// "Row N: reason" lines in file order
    pub errors: Vec<String>,
}

/// POST /api/alumni/import
///
/// Partial success is still 200; failed rows are listed in `errors`.
pub async fn import_alumni(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<ImportResponse>> {
    let limits = state.import_config.clone();

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some((file_name, bytes));
        break;
    }

    let Some((file_name, bytes)) = upload else {
        return Err(ApiError::BadRequest(format!(
            "Multipart field '{}' is required",
            FILE_FIELD
        )));
    };

    if bytes.len() > limits.max_upload_bytes {
        return Err(ApiError::Unprocessable(format!(
            "File is {} bytes; the limit is {} bytes",
            bytes.len(),
            limits.max_upload_bytes
        )));
    }

    let format = SpreadsheetFormat::from_file_name(&file_name)?;
    tracing::info!(file = %file_name, bytes = bytes.len(), ?format, "Received alumni import upload");

    let decoded = tokio::task::spawn_blocking(move || decode(&bytes, format))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Decode task failed");
            ApiError::Internal("The uploaded file could not be processed".to_string())
        })?;

    let rows = match decoded {
        Ok(rows) => rows,
        Err(e) => {
            state.record_import_failure(format!("{}: {}", file_name, e));
            return Err(e.into());
        }
    };

    // Header row does not count against the limit
    let data_rows = rows.len().saturating_sub(1);
    if data_rows > limits.max_rows {
        return Err(ApiError::Unprocessable(format!(
            "File has {} data rows; the limit is {}",
            data_rows, limits.max_rows
        )));
    }

    let engine = ReconciliationEngine::new(
        &state.store,
        &state.store,
        RowValidator::new(limits.rating_policy),
        limits.employment_normalization,
    )
    .with_events(&state.event_bus);

    let report = match engine.import_batch(rows).await {
        Ok(report) => report,
        Err(e) => {
            state.record_import_failure(format!("{}: {}", file_name, e));
            return Err(e.into());
        }
    };

    Ok(Json(ImportResponse {
        batch_id: report.batch_id,
        imported: report.imported,
        created: report.created,
        updated: report.updated,
        skipped: report.skipped,
        message: report.message(),
        errors: report.error_lines(),
    }))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::Unprocessable("File exceeds the upload size limit".to_string())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}
