//! Database models

use serde::{Deserialize, Serialize};

/// Status value that keeps employment details on write
pub const EMPLOYED_STATUS: &str = "employed";

/// Writable columns of one alumni tracer survey response
///
/// `student_number` is the natural key; everything else is overwritten
/// wholesale on upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlumniFields {
    pub student_number: String,
    pub email: Option<String>,
    pub program_id: Option<i64>,
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
    pub instruction_rating: Option<u8>,
}

impl AlumniFields {
    /// Empty record carrying only the natural key
    pub fn new(student_number: impl Into<String>) -> Self {
        Self {
            student_number: student_number.into(),
            ..Default::default()
        }
    }

    pub fn is_employed(&self) -> bool {
        self.employment_status
            .as_deref()
            .map(|s| s.trim().eq_ignore_ascii_case(EMPLOYED_STATUS))
            .unwrap_or(false)
    }

    /// Clear the employment-dependent fields unless the alumnus is employed
    ///
    /// Returns true if anything was cleared.
    pub fn clear_employment_details_unless_employed(&mut self) -> bool {
        if self.is_employed() {
            return false;
        }

        let slots = [
            &mut self.company_name,
            &mut self.work_position,
            &mut self.sector,
            &mut self.work_location,
            &mut self.employer_classification,
            &mut self.related_to_course,
        ];

        let mut cleared = false;
        for slot in slots {
            if slot.take().is_some() {
                cleared = true;
            }
        }
        cleared
    }
}

/// Stored alumni record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlumniRecord {
    pub id: i64,
    #[serde(flatten)]
    pub fields: AlumniFields,
    pub created_at: String,
    pub updated_at: String,
}

/// Academic program reference entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: i64,
    /// Normalized (trimmed, uppercase) display name
    pub name: String,
}

/// Canonical form used for program uniqueness: trimmed and uppercased
///
/// Punctuation and inner spacing are kept as-is, so "B.S. IT" and "BS IT"
/// are distinct programs.
pub fn normalize_program_name(raw: &str) -> String {
    raw.trim().to_uppercase()
}
