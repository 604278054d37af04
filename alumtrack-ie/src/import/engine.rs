//! Reconciliation engine
//!
//! Drives one import batch: each data row is validated, its program resolved,
//! merged onto any stored record with the same student number and upserted.
//! Failures stay local to their row and end up in the `ImportReport`; only a
//! missing header or a sheet with nothing but blank rows fails the batch. There is no enclosing
//! transaction, so rows saved before a failure stay saved.

use alumtrack_common::config::EmploymentNormalization;
use alumtrack_common::events::{AlumtrackEvent, EventBus, RecordSource};
use alumtrack_common::AlumniFields;
use chrono::Utc;
use uuid::Uuid;

use super::columns::ColumnLayout;
use super::decoder::{DecodeError, RawRow, RowStream};
use super::report::{ImportReport, RowErrorKind};
use super::resolver::ReferenceResolver;
use super::validator::RowValidator;
use crate::store::{AlumniStore, ProgramStore};

pub struct ReconciliationEngine<'a> {
    alumni: &'a dyn AlumniStore,
    resolver: ReferenceResolver<'a>,
    validator: RowValidator,
    employment: EmploymentNormalization,
    events: Option<&'a EventBus>,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(
        alumni: &'a dyn AlumniStore,
        programs: &'a dyn ProgramStore,
        validator: RowValidator,
        employment: EmploymentNormalization,
    ) -> Self {
        Self {
            alumni,
            resolver: ReferenceResolver::new(programs),
            validator,
            employment,
            events: None,
        }
    }

    /// Publish record and batch events on `bus`
    pub fn with_events(mut self, bus: &'a EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub async fn import_batch(&self, mut rows: RowStream) -> Result<ImportReport, DecodeError> {
        let header = rows.next().ok_or(DecodeError::Empty)?;
        let rows: Vec<RawRow> = rows.collect();
        // Trailing formatted-but-empty rows do not make a batch
        if rows.iter().all(RawRow::is_blank) {
            return Err(DecodeError::Empty);
        }

        let layout = ColumnLayout::detect(&header);
        let mut report = ImportReport::new(Uuid::new_v4());

        tracing::info!(
            batch_id = %report.batch_id,
            rows = rows.len(),
            header_layout = layout.is_from_header(),
            "Starting alumni import"
        );

        for row in rows {
            if self.validator.is_skippable(&row, &layout) {
                report.skipped += 1;
                continue;
            }
            self.import_row(&row, &layout, &mut report).await;
        }

        tracing::info!(
            batch_id = %report.batch_id,
            imported = report.imported,
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed(),
            "Alumni import finished"
        );

        if let Some(bus) = self.events {
            bus.emit_lossy(AlumtrackEvent::AlumniImportCompleted {
                batch_id: report.batch_id,
                imported: report.imported,
                created: report.created,
                updated: report.updated,
                failed: report.failed(),
                timestamp: Utc::now(),
            });
        }

        Ok(report)
    }

    async fn import_row(&self, row: &RawRow, layout: &ColumnLayout, report: &mut ImportReport) {
        let batch_id = report.batch_id;

        let normalized = match self.validator.validate(row, layout) {
            Ok(n) => n,
            Err(rejection) => {
                tracing::warn!(%batch_id, row = row.line, error = %rejection, "Row rejected");
                report.record_error(row.line, RowErrorKind::Validation, rejection.to_string());
                return;
            }
        };

        let existing = match self.alumni.find_by_student_number(&normalized.student_number).await {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!(%batch_id, row = row.line, student_number = %normalized.student_number, error = %e, "Lookup failed");
                report.record_error(row.line, RowErrorKind::Store, e.user_message());
                return;
            }
        };

        let mut fields = existing
            .map(|r| r.fields)
            .unwrap_or_else(|| AlumniFields::new(normalized.student_number.clone()));

        if normalized.carries_program() {
            match self.resolver.resolve(normalized.program.as_deref()).await {
                Ok(program_id) => fields.program_id = program_id,
                Err(e) => {
                    tracing::warn!(%batch_id, row = row.line, error = %e, "Program resolution failed");
                    report.record_error(row.line, RowErrorKind::Reference, e.user_message());
                    return;
                }
            }
        }

        normalized.apply_to(&mut fields);
        if self.employment.applies_to_import() {
            fields.clear_employment_details_unless_employed();
        }

        match self.alumni.upsert(&fields).await {
            Ok(outcome) => {
                report.record_saved(outcome.is_created());
                tracing::debug!(%batch_id, row = row.line, student_number = %fields.student_number, ?outcome, "Row saved");
                if let Some(bus) = self.events {
                    bus.emit_lossy(AlumtrackEvent::AlumniRecordSaved {
                        record_id: outcome.id(),
                        student_number: fields.student_number.clone(),
                        created: outcome.is_created(),
                        source: RecordSource::BulkImport,
                        timestamp: Utc::now(),
                    });
                }
            }
            Err(e) => {
                tracing::warn!(%batch_id, row = row.line, student_number = %fields.student_number, error = %e, "Upsert failed");
                report.record_error(row.line, RowErrorKind::Store, e.user_message());
            }
        }
    }
}
