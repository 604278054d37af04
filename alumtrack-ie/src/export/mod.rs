//! Alumni spreadsheet export

pub mod encoder;

use std::collections::HashMap;

use thiserror::Error;

use crate::store::{AlumniStore, ProgramStore, StoreError};

/// File name offered to the browser
pub const EXPORT_FILE_NAME: &str = "alumni_tracer_export.xlsx";

pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No alumni records match the selection")]
    EmptyResult,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to build spreadsheet: {0}")]
    Encode(#[from] rust_xlsxwriter::XlsxError),
}

/// Export the selected records (all of them for an empty `ids`)
///
/// Rows are ordered by last name, given name, then id.
pub async fn export_alumni(
    alumni: &dyn AlumniStore,
    programs: &dyn ProgramStore,
    ids: &[i64],
) -> Result<Vec<u8>, ExportError> {
    let records = alumni.find_by_ids(ids).await?;
    if records.is_empty() {
        return Err(ExportError::EmptyResult);
    }

    let mut program_ids: Vec<i64> = records.iter().filter_map(|r| r.fields.program_id).collect();
    program_ids.sort_unstable();
    program_ids.dedup();

    let program_names: HashMap<i64, String> = programs
        .find_programs(&program_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();

    let bytes = encoder::encode(&records, &program_names)?;
    tracing::info!(
        records = records.len(),
        requested = ids.len(),
        bytes = bytes.len(),
        "Exported alumni spreadsheet"
    );
    Ok(bytes)
}
