//! Bulk alumni import pipeline
//!
//! `decoder` turns the upload into rows, `engine` reconciles them against the
//! store using `validator` and `resolver`, and `report` collects the outcome.

pub mod columns;
pub mod decoder;
pub mod engine;
pub mod report;
pub mod resolver;
pub mod validator;

pub use columns::{ColumnLayout, ImportColumn};
pub use decoder::{decode, DecodeError, RawRow, RowStream, SpreadsheetFormat};
pub use engine::ReconciliationEngine;
pub use report::{ImportReport, RowError, RowErrorKind};
pub use resolver::{ReferenceResolver, ResolveError};
pub use validator::{parse_consent, parse_graduation_year, parse_rating, NormalizedRecord, Rejection, RowValidator};
