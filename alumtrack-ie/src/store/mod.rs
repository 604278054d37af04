//! Persistence seams for the import/export pipeline
//!
//! The reconciliation engine, resolver and exporter only see these traits.
//! `SqliteStore` is the production implementation.

mod sqlite;

pub use sqlite::SqliteStore;

use alumtrack_common::{AlumniFields, AlumniRecord, Program};
use async_trait::async_trait;
use thiserror::Error;

/// Store failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// Write violates a constraint other than the natural key
    /// (message is safe to show to users)
    #[error("{0}")]
    Conflict(String),

    /// Unique constraint hit, e.g. a concurrent program create
    #[error("Unique constraint failed: {constraint}")]
    UniqueViolation { constraint: String },

    /// Row cannot be deleted while other rows reference it
    #[error("{0} is still referenced by alumni records")]
    InUse(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Database still locked after {attempts} attempts ({elapsed_ms} ms)")]
    LockTimeout { attempts: u32, elapsed_ms: u64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Common(#[from] alumtrack_common::Error),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }

    /// Text that can be returned to API callers without leaking internals
    pub fn user_message(&self) -> String {
        match self {
            StoreError::Conflict(msg) => msg.clone(),
            StoreError::UniqueViolation { .. } => "Record conflicts with an existing entry".to_string(),
            StoreError::InUse(what) => format!("{} is still referenced by alumni records", what),
            StoreError::NotFound(what) => format!("{} not found", what),
            StoreError::LockTimeout { .. } => "Database is busy, please retry".to_string(),
            StoreError::Database(_) | StoreError::Common(_) => "Database error while saving record".to_string(),
        }
    }
}

/// Whether an upsert inserted or overwrote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(i64),
    Updated(i64),
}

impl UpsertOutcome {
    pub fn id(self) -> i64 {
        match self {
            UpsertOutcome::Created(id) | UpsertOutcome::Updated(id) => id,
        }
    }

    pub fn is_created(self) -> bool {
        matches!(self, UpsertOutcome::Created(_))
    }
}

/// Alumni records keyed by student number
#[async_trait]
pub trait AlumniStore: Send + Sync {
    async fn find_by_student_number(&self, student_number: &str) -> Result<Option<AlumniRecord>, StoreError>;

    /// Insert, or overwrite every column of the record with the same student number
    async fn upsert(&self, fields: &AlumniFields) -> Result<UpsertOutcome, StoreError>;

    /// Insert only; an existing student number is a `Conflict`
    async fn insert(&self, fields: &AlumniFields) -> Result<AlumniRecord, StoreError>;

    /// Records with the given ids; an empty slice selects every record
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<AlumniRecord>, StoreError>;

    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64, StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;
}

/// Program reference table
#[async_trait]
pub trait ProgramStore: Send + Sync {
    /// Look up by already-normalized name
    async fn find_by_name(&self, normalized_name: &str) -> Result<Option<Program>, StoreError>;

    /// Create with an already-normalized name; `UniqueViolation` if it exists
    async fn create(&self, normalized_name: &str) -> Result<Program, StoreError>;

    async fn find_programs(&self, ids: &[i64]) -> Result<Vec<Program>, StoreError>;

    async fn list(&self) -> Result<Vec<Program>, StoreError>;

    /// Delete unless referenced (`InUse`) or absent (`NotFound`)
    async fn delete(&self, id: i64) -> Result<(), StoreError>;
}
