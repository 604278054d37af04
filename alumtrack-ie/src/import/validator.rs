//! Per-row validation and normalization

use alumtrack_common::config::RatingPolicy;
use alumtrack_common::AlumniFields;
use thiserror::Error;

use super::columns::{ColumnLayout, ImportColumn};
use super::decoder::RawRow;

/// Row-local validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid graduation year '{0}' (expected 4 digits)")]
    InvalidGraduationYear(String),

    #[error("Invalid instruction rating '{0}' (expected a whole number)")]
    InvalidRating(String),

    #[error("Instruction rating {0} is outside 1-5")]
    RatingOutOfRange(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a whole number")]
pub struct RatingParseError(pub String);

/// "yes" in any case means consent; everything else, blank included, does not
pub fn parse_consent(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("yes")
}

/// Whole-number rating; "4.0" is accepted since spreadsheets store numbers as floats
pub fn parse_rating(text: &str) -> Result<i64, RatingParseError> {
    let trimmed = text.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(value);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() <= i64::MAX as f64 => Ok(f as i64),
        _ => Err(RatingParseError(trimmed.to_string())),
    }
}

/// Exactly four ASCII digits
pub fn parse_graduation_year(text: &str) -> Option<i32> {
    let trimmed = text.trim();
    if trimmed.len() == 4 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        trimmed.parse().ok()
    } else {
        None
    }
}

/// Validated row, ready to merge into a stored record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRecord {
    /// 1-based sheet row the values came from
    pub line: usize,
    pub student_number: String,
    pub email: Option<String>,
    /// Raw program text, resolved separately
    pub program: Option<String>,
    pub last_name: String,
    pub given_name: String,
    pub middle_initial: Option<String>,
    pub sex: Option<String>,
    pub present_address: Option<String>,
    pub contact_number: Option<String>,
    pub graduation_year: Option<i32>,
    pub employment_status: Option<String>,
    pub company_name: Option<String>,
    pub further_studies: Option<String>,
    pub sector: Option<String>,
    pub work_location: Option<String>,
    pub employer_classification: Option<String>,
    pub related_to_course: Option<String>,
    pub consent: bool,
    pub instruction_rating: Option<u8>,
    /// Columns the layout actually provided
    pub carried: Vec<ImportColumn>,
}

impl NormalizedRecord {
    /// Overwrite every carried column of `fields`
    ///
    /// The program column is left to the caller since it needs resolving.
    pub fn apply_to(&self, fields: &mut AlumniFields) {
        fields.student_number = self.student_number.clone();
        for column in &self.carried {
            match column {
                ImportColumn::StudentNumber | ImportColumn::Program => {}
                ImportColumn::Email => fields.email = self.email.clone(),
                ImportColumn::LastName => fields.last_name = self.last_name.clone(),
                ImportColumn::GivenName => fields.given_name = self.given_name.clone(),
                ImportColumn::MiddleInitial => fields.middle_initial = self.middle_initial.clone(),
                ImportColumn::Sex => fields.sex = self.sex.clone(),
                ImportColumn::PresentAddress => fields.present_address = self.present_address.clone(),
                ImportColumn::ContactNumber => fields.contact_number = self.contact_number.clone(),
                ImportColumn::GraduationYear => fields.graduation_year = self.graduation_year,
                ImportColumn::EmploymentStatus => {
                    fields.employment_status = self.employment_status.clone()
                }
                ImportColumn::CompanyName => fields.company_name = self.company_name.clone(),
                ImportColumn::FurtherStudies => fields.further_studies = self.further_studies.clone(),
                ImportColumn::Sector => fields.sector = self.sector.clone(),
                ImportColumn::WorkLocation => fields.work_location = self.work_location.clone(),
                ImportColumn::EmployerClassification => {
                    fields.employer_classification = self.employer_classification.clone()
                }
                ImportColumn::RelatedToCourse => {
                    fields.related_to_course = self.related_to_course.clone()
                }
                ImportColumn::Consent => fields.consent = self.consent,
                ImportColumn::InstructionRating => fields.instruction_rating = self.instruction_rating,
            }
        }
    }

    /// Whether the layout carried the program column
    pub fn carries_program(&self) -> bool {
        self.carried.contains(&ImportColumn::Program)
    }
}

/// Row checks parameterized by the configured rating policy
#[derive(Debug, Clone, Copy, Default)]
pub struct RowValidator {
    rating_policy: RatingPolicy,
}

impl RowValidator {
    pub fn new(rating_policy: RatingPolicy) -> Self {
        Self { rating_policy }
    }

    /// Rows that are silently ignored: blank, no student number, or a repeated header
    pub fn is_skippable(&self, row: &RawRow, layout: &ColumnLayout) -> bool {
        if row.is_blank() {
            return true;
        }
        match layout.get(row, ImportColumn::StudentNumber) {
            None => true,
            Some(value) => layout.is_header_label(value),
        }
    }

    pub fn validate(&self, row: &RawRow, layout: &ColumnLayout) -> Result<NormalizedRecord, Rejection> {
        let text = |column| layout.get(row, column).map(str::to_string);
        let required = |column: ImportColumn| {
            layout
                .get(row, column)
                .map(str::to_string)
                .ok_or(Rejection::MissingField(column.key()))
        };

        let student_number = required(ImportColumn::StudentNumber)?;
        let last_name = required(ImportColumn::LastName)?;
        let given_name = required(ImportColumn::GivenName)?;

        let graduation_year = match layout.get(row, ImportColumn::GraduationYear) {
            None => None,
            Some(raw) => Some(
                parse_graduation_year(raw)
                    .ok_or_else(|| Rejection::InvalidGraduationYear(raw.to_string()))?,
            ),
        };

        let instruction_rating = match layout.get(row, ImportColumn::InstructionRating) {
            None => None,
            Some(raw) => Some(self.check_rating(raw)?),
        };

        Ok(NormalizedRecord {
            line: row.line,
            student_number,
            email: layout
                .get(row, ImportColumn::Email)
                .map(|e| e.to_lowercase()),
            program: text(ImportColumn::Program),
            last_name,
            given_name,
            middle_initial: text(ImportColumn::MiddleInitial),
            sex: text(ImportColumn::Sex),
            present_address: text(ImportColumn::PresentAddress),
            contact_number: text(ImportColumn::ContactNumber),
            graduation_year,
            employment_status: text(ImportColumn::EmploymentStatus),
            company_name: text(ImportColumn::CompanyName),
            further_studies: text(ImportColumn::FurtherStudies),
            sector: text(ImportColumn::Sector),
            work_location: text(ImportColumn::WorkLocation),
            employer_classification: text(ImportColumn::EmployerClassification),
            related_to_course: text(ImportColumn::RelatedToCourse),
            consent: layout
                .get(row, ImportColumn::Consent)
                .map(parse_consent)
                .unwrap_or(false),
            instruction_rating,
            carried: ImportColumn::ALL
                .into_iter()
                .filter(|c| layout.position(*c).is_some())
                .collect(),
        })
    }

    fn check_rating(&self, raw: &str) -> Result<u8, Rejection> {
        let value = parse_rating(raw).map_err(|e| Rejection::InvalidRating(e.0))?;
        match self.rating_policy {
            RatingPolicy::Clamp => Ok(value.clamp(1, 5) as u8),
            RatingPolicy::Reject if (1..=5).contains(&value) => Ok(value as u8),
            RatingPolicy::Reject => Err(Rejection::RatingOutOfRange(value)),
        }
    }
}
