//! Alumni record lifecycle endpoints
//!
//! Manual add (administrative), survey update (self-service), lookup and
//! bulk delete. Program references go through the same resolver as imports.

use alumtrack_common::events::{AlumtrackEvent, RecordSource};
use alumtrack_common::{AlumniFields, AlumniRecord};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::import::{ReferenceResolver, ResolveError};
use crate::store::AlumniStore;
use crate::AppState;

/// Survey payload for add and update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AlumniInput {
    pub student_number: Option<String>,
    pub email: Option<String>,
    /// Program name, or `{"id": n}` / `{"name": "..."}`
    pub program: Option<Value>,
    pub last_name: String,
    pub given_name: String,
    pub middle_initial: Option<String>,
    pub sex: Option<String>,
    pub present_address: Option<String>,
    pub contact_number: Option<String>,
    pub graduation_year: Option<i32>,
    pub employment_status: Option<String>,
    pub company_name: Option<String>,
    pub work_position: Option<String>,
    pub further_studies: Option<String>,
    pub sector: Option<String>,
    pub work_location: Option<String>,
    pub employer_classification: Option<String>,
    pub related_to_course: Option<String>,
    pub consent: bool,
    pub instruction_rating: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: u64,
}

/// GET /api/alumni/:student_number
pub async fn get_alumni(
    State(state): State<AppState>,
    Path(student_number): Path<String>,
) -> ApiResult<Json<AlumniRecord>> {
    state
        .store
        .find_by_student_number(&student_number)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Alumni record {}", student_number)))
}

/// POST /api/alumni
pub async fn create_alumni(
    State(state): State<AppState>,
    Json(input): Json<AlumniInput>,
) -> ApiResult<(StatusCode, Json<AlumniRecord>)> {
    let student_number = input
        .student_number
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::Unprocessable("student_number is required".to_string()))?;

    let mut fields = to_fields(&state, student_number, &input).await?;
    if state.import_config.employment_normalization.applies_to_import() {
        fields.clear_employment_details_unless_employed();
    }

    let record = state.store.insert(&fields).await?;
    tracing::info!(record_id = record.id, student_number = %record.fields.student_number, "Alumni record added");

    state.event_bus.emit_lossy(AlumtrackEvent::AlumniRecordSaved {
        record_id: record.id,
        student_number: record.fields.student_number.clone(),
        created: true,
        source: RecordSource::Administrative,
        timestamp: Utc::now(),
    });

    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /api/alumni/:student_number
///
/// Replaces the stored survey answers. The employment rule always applies here.
pub async fn update_alumni(
    State(state): State<AppState>,
    Path(student_number): Path<String>,
    Json(input): Json<AlumniInput>,
) -> ApiResult<Json<AlumniRecord>> {
    if let Some(body_sn) = input.student_number.as_deref().map(str::trim) {
        if !body_sn.is_empty() && body_sn != student_number {
            return Err(ApiError::BadRequest("Student number cannot be changed".to_string()));
        }
    }

    if state.store.find_by_student_number(&student_number).await?.is_none() {
        return Err(ApiError::NotFound(format!("Alumni record {}", student_number)));
    }

    let mut fields = to_fields(&state, student_number.clone(), &input).await?;
    fields.clear_employment_details_unless_employed();

    let outcome = state.store.upsert(&fields).await?;
    tracing::info!(record_id = outcome.id(), student_number = %student_number, "Alumni record updated");

    state.event_bus.emit_lossy(AlumtrackEvent::AlumniRecordSaved {
        record_id: outcome.id(),
        student_number: student_number.clone(),
        created: outcome.is_created(),
        source: RecordSource::SelfService,
        timestamp: Utc::now(),
    });

    state
        .store
        .find_by_student_number(&student_number)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::Internal("Record vanished after update".to_string()))
}

/// POST /api/alumni/bulk-delete
pub async fn bulk_delete_alumni(
    State(state): State<AppState>,
    Json(request): Json<BulkDeleteRequest>,
) -> ApiResult<Json<BulkDeleteResponse>> {
    if request.ids.is_empty() {
        return Err(ApiError::BadRequest("ids must not be empty".to_string()));
    }

    let deleted = state.store.delete_by_ids(&request.ids).await?;
    tracing::info!(requested = request.ids.len(), deleted, "Alumni records deleted");

    if deleted > 0 {
        state.event_bus.emit_lossy(AlumtrackEvent::AlumniRecordsDeleted {
            count: deleted,
            timestamp: Utc::now(),
        });
    }

    Ok(Json(BulkDeleteResponse { deleted }))
}

/// Validate `input` and resolve its program
async fn to_fields(state: &AppState, student_number: String, input: &AlumniInput) -> ApiResult<AlumniFields> {
    let last_name = required(&input.last_name, "last_name")?;
    let given_name = required(&input.given_name, "given_name")?;

    if let Some(year) = input.graduation_year {
        if !(1000..=9999).contains(&year) {
            return Err(ApiError::Unprocessable(format!(
                "Invalid graduation year {} (expected 4 digits)",
                year
            )));
        }
    }

    let instruction_rating = match input.instruction_rating {
        None => None,
        Some(r) if (1..=5).contains(&r) => Some(r as u8),
        Some(r) => {
            return Err(ApiError::Unprocessable(format!(
                "Instruction rating {} is outside 1-5",
                r
            )))
        }
    };

    let program_text = input.program.as_ref().and_then(program_reference);
    let program_id = ReferenceResolver::new(&state.store)
        .resolve(program_text.as_deref())
        .await
        .map_err(|e| match e {
            ResolveError::Store(store) => ApiError::Store(store),
            other => ApiError::Unprocessable(other.to_string()),
        })?;

    Ok(AlumniFields {
        student_number,
        email: clean(&input.email).map(|e| e.to_lowercase()),
        program_id,
        last_name,
        given_name,
        middle_initial: clean(&input.middle_initial),
        sex: clean(&input.sex),
        present_address: clean(&input.present_address),
        contact_number: clean(&input.contact_number),
        graduation_year: input.graduation_year,
        employment_status: clean(&input.employment_status),
        company_name: clean(&input.company_name),
        work_position: clean(&input.work_position),
        further_studies: clean(&input.further_studies),
        sector: clean(&input.sector),
        work_location: clean(&input.work_location),
        employer_classification: clean(&input.employer_classification),
        related_to_course: clean(&input.related_to_course),
        consent: input.consent,
        instruction_rating,
    })
}

/// Text form understood by `ReferenceResolver`
fn program_reference(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(format!("{{\"id\": {}}}", n)),
        other => Some(other.to_string()),
    }
}

fn required(value: &str, name: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ApiError::Unprocessable(format!("{} is required", name)))
    } else {
        Ok(trimmed.to_string())
    }
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
