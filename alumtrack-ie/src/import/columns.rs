//! Column addressing for import rows
//!
//! The canonical positional order is what the survey template uses. Exported
//! documents carry human labels and no email column, so a header row whose
//! labels name the required columns switches the layout to header lookup.

use std::collections::HashMap;

use super::decoder::RawRow;

/// Imported columns in template order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportColumn {
    StudentNumber,
    Email,
    Program,
    LastName,
    GivenName,
    MiddleInitial,
    Sex,
    PresentAddress,
    ContactNumber,
    GraduationYear,
    EmploymentStatus,
    CompanyName,
    FurtherStudies,
    Sector,
    WorkLocation,
    EmployerClassification,
    RelatedToCourse,
    Consent,
    InstructionRating,
}

impl ImportColumn {
    pub const ALL: [ImportColumn; 19] = [
        ImportColumn::StudentNumber,
        ImportColumn::Email,
        ImportColumn::Program,
        ImportColumn::LastName,
        ImportColumn::GivenName,
        ImportColumn::MiddleInitial,
        ImportColumn::Sex,
        ImportColumn::PresentAddress,
        ImportColumn::ContactNumber,
        ImportColumn::GraduationYear,
        ImportColumn::EmploymentStatus,
        ImportColumn::CompanyName,
        ImportColumn::FurtherStudies,
        ImportColumn::Sector,
        ImportColumn::WorkLocation,
        ImportColumn::EmployerClassification,
        ImportColumn::RelatedToCourse,
        ImportColumn::Consent,
        ImportColumn::InstructionRating,
    ];

    /// Columns a header must name before it is trusted over position
    pub const REQUIRED: [ImportColumn; 3] = [
        ImportColumn::StudentNumber,
        ImportColumn::LastName,
        ImportColumn::GivenName,
    ];

    /// Snake-case key; also the normalized form of the export label
    pub fn key(self) -> &'static str {
        match self {
            ImportColumn::StudentNumber => "student_number",
            ImportColumn::Email => "email",
            ImportColumn::Program => "program",
            ImportColumn::LastName => "last_name",
            ImportColumn::GivenName => "given_name",
            ImportColumn::MiddleInitial => "middle_initial",
            ImportColumn::Sex => "sex",
            ImportColumn::PresentAddress => "present_address",
            ImportColumn::ContactNumber => "contact_number",
            ImportColumn::GraduationYear => "graduation_year",
            ImportColumn::EmploymentStatus => "employment_status",
            ImportColumn::CompanyName => "company_name",
            ImportColumn::FurtherStudies => "further_studies",
            ImportColumn::Sector => "sector",
            ImportColumn::WorkLocation => "work_location",
            ImportColumn::EmployerClassification => "employer_classification",
            ImportColumn::RelatedToCourse => "related_to_course",
            ImportColumn::Consent => "consent",
            ImportColumn::InstructionRating => "instruction_rating",
        }
    }

    /// Header label written by the exporter (`None` for columns not exported)
    pub fn export_label(self) -> Option<&'static str> {
        let label = match self {
            ImportColumn::StudentNumber => "Student Number",
            ImportColumn::Email => return None,
            ImportColumn::Program => "Program",
            ImportColumn::LastName => "Last Name",
            ImportColumn::GivenName => "Given Name",
            ImportColumn::MiddleInitial => "Middle Initial",
            ImportColumn::Sex => "Sex",
            ImportColumn::PresentAddress => "Present Address",
            ImportColumn::ContactNumber => "Contact Number",
            ImportColumn::GraduationYear => "Graduation Year",
            ImportColumn::EmploymentStatus => "Employment Status",
            ImportColumn::CompanyName => "Company Name",
            ImportColumn::FurtherStudies => "Further Studies",
            ImportColumn::Sector => "Sector",
            ImportColumn::WorkLocation => "Work Location",
            ImportColumn::EmployerClassification => "Employer Classification",
            ImportColumn::RelatedToCourse => "Related To Course",
            ImportColumn::Consent => "Consent",
            ImportColumn::InstructionRating => "Instruction Rating",
        };
        Some(label)
    }

    /// Exported columns in order
    pub fn exported() -> impl Iterator<Item = ImportColumn> {
        Self::ALL.into_iter().filter(|c| c.export_label().is_some())
    }

    fn from_key(key: &str) -> Option<ImportColumn> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

/// Lowercase, with every run of non-alphanumerics collapsed to `_`
///
/// "Student Number" and " student-number " both become "student_number".
pub fn normalize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_sep = false;
    for ch in label.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Where each imported column lives in a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    positions: HashMap<ImportColumn, usize>,
    from_header: bool,
    /// Normalized label the header row carried in the student number column
    header_label: Option<String>,
}

impl ColumnLayout {
    /// Template order
    pub fn positional() -> Self {
        Self {
            positions: ImportColumn::ALL
                .into_iter()
                .enumerate()
                .map(|(i, c)| (c, i))
                .collect(),
            from_header: false,
            header_label: None,
        }
    }

    /// Build from the header row when it names the required columns,
    /// otherwise fall back to template order
    pub fn detect(header: &RawRow) -> Self {
        let mut positions = HashMap::new();
        for (index, cell) in header.cells.iter().enumerate() {
            let Some(label) = cell.as_deref() else { continue };
            if let Some(column) = ImportColumn::from_key(&normalize_label(label)) {
                // First occurrence wins
                positions.entry(column).or_insert(index);
            }
        }

        let mut layout = if ImportColumn::REQUIRED.iter().all(|c| positions.contains_key(c)) {
            tracing::debug!(columns = positions.len(), "Using header-based column layout");
            Self {
                positions,
                from_header: true,
                header_label: None,
            }
        } else {
            Self::positional()
        };
        layout.header_label = layout
            .position(ImportColumn::StudentNumber)
            .and_then(|i| header.cell(i))
            .map(normalize_label)
            .filter(|label| !label.is_empty());
        layout
    }

    pub fn is_from_header(&self) -> bool {
        self.from_header
    }

    /// Whether `value` repeats this file's student number header label
    pub fn is_header_label(&self, value: &str) -> bool {
        let value = normalize_label(value);
        value == ImportColumn::StudentNumber.key() || self.header_label.as_deref() == Some(value.as_str())
    }

    pub fn position(&self, column: ImportColumn) -> Option<usize> {
        self.positions.get(&column).copied()
    }

    /// Trimmed cell text, `None` when blank or the column is absent
    pub fn get<'r>(&self, row: &'r RawRow, column: ImportColumn) -> Option<&'r str> {
        self.position(column)
            .and_then(|i| row.cell(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
