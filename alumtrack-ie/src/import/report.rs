//! Import outcome reporting

use serde::Serialize;
use uuid::Uuid;

/// Stage at which a row failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowErrorKind {
    Validation,
    Reference,
    Store,
}

/// One failed row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// 1-based spreadsheet row (header is row 1)
    pub row_index: usize,
    pub kind: RowErrorKind,
    pub reason: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Row {}: {}", self.row_index, self.reason)
    }
}

/// Result of one import batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub batch_id: Uuid,
    /// `created + updated`
    pub imported: usize,
    pub created: usize,
    pub updated: usize,
    /// Blank rows and rows without a student number
    pub skipped: usize,
    /// Failed rows in file order
    pub errors: Vec<RowError>,
}

impl ImportReport {
    pub fn new(batch_id: Uuid) -> Self {
        Self {
            batch_id,
            imported: 0,
            created: 0,
            updated: 0,
            skipped: 0,
            errors: Vec::new(),
        }
    }

    pub(crate) fn record_saved(&mut self, created: bool) {
        self.imported += 1;
        if created {
            self.created += 1;
        } else {
            self.updated += 1;
        }
    }

    pub(crate) fn record_error(&mut self, row_index: usize, kind: RowErrorKind, reason: impl Into<String>) {
        self.errors.push(RowError {
            row_index,
            kind,
            reason: reason.into(),
        });
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    /// Summary line shown to the uploader
    pub fn message(&self) -> String {
        let mut message = format!(
            "Imported {} record(s): {} created, {} updated",
            self.imported, self.created, self.updated
        );
        if !self.errors.is_empty() {
            message.push_str(&format!("; {} row(s) failed", self.errors.len()));
        }
        if self.skipped > 0 {
            message.push_str(&format!("; {} blank row(s) skipped", self.skipped));
        }
        message
    }

    /// Error lines as "Row N: reason"
    pub fn error_lines(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}
