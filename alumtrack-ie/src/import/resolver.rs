//! Program reference resolution (find-or-create)

use alumtrack_common::db::models::normalize_program_name;
use serde_json::Value;
use thiserror::Error;

use crate::store::{ProgramStore, StoreError};

/// Attempts before a contended create is given up
const MAX_ATTEMPTS: u32 = 3;

/// Row-local program resolution failure
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Program reference '{0}' has neither a valid id nor a name")]
    InvalidReference(String),

    #[error("Program '{name}' could not be created after {attempts} attempts")]
    Contended { name: String, attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResolveError {
    pub fn user_message(&self) -> String {
        match self {
            ResolveError::Store(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Resolves free-text program references against the program table
pub struct ReferenceResolver<'a> {
    programs: &'a dyn ProgramStore,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(programs: &'a dyn ProgramStore) -> Self {
        Self { programs }
    }

    /// Program id for `raw`, creating the program on first sight
    ///
    /// Accepts plain text or a JSON object `{"id": 3}` / `{"name": "BSIT"}`
    /// as sent by form clients.
    pub async fn resolve(&self, raw: Option<&str>) -> Result<Option<i64>, ResolveError> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        let name = if raw.starts_with('{') {
            match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => {
                    if let Some(id) = map.get("id").and_then(json_id) {
                        return Ok(Some(id));
                    }
                    match map.get("name").and_then(Value::as_str).map(str::trim) {
                        Some(name) if !name.is_empty() => name.to_string(),
                        _ => return Err(ResolveError::InvalidReference(raw.to_string())),
                    }
                }
                // Brace-prefixed but not JSON: an unusual program name
                _ => raw.to_string(),
            }
        } else {
            raw.to_string()
        };

        self.find_or_create(&normalize_program_name(&name)).await.map(Some)
    }

    async fn find_or_create(&self, normalized: &str) -> Result<i64, ResolveError> {
        for attempt in 1..=MAX_ATTEMPTS {
            if let Some(program) = self.programs.find_by_name(normalized).await? {
                return Ok(program.id);
            }

            match self.programs.create(normalized).await {
                Ok(program) => {
                    tracing::info!(program_id = program.id, name = %program.name, "Created program");
                    return Ok(program.id);
                }
                Err(e) if e.is_unique_violation() => {
                    // Another writer created it between our lookup and insert
                    tracing::debug!(name = normalized, attempt, "Program create lost race, re-querying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ResolveError::Contended {
            name: normalized.to_string(),
            attempts: MAX_ATTEMPTS,
        })
    }
}

/// Positive integer id, also accepting "7" as a string
fn json_id(value: &Value) -> Option<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    (id > 0).then_some(id)
}
