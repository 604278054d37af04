//! Alumni records to xlsx
//!
//! Columns and labels mirror the import side (`ImportColumn::exported`) so a
//! downloaded sheet can be edited and uploaded again unchanged.

use std::collections::HashMap;

use alumtrack_common::AlumniRecord;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet, XlsxError};

use crate::import::ImportColumn;

pub const SHEET_NAME: &str = "Alumni";

/// Render `records` (already in output order) as an xlsx document
///
/// `program_names` maps program ids to display names; an id missing from the
/// map leaves the Program cell blank.
pub fn encode(records: &[AlumniRecord], program_names: &HashMap<i64, String>) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let header_format = Format::new()
        .set_bold()
        .set_border(FormatBorder::Thin)
        .set_background_color(Color::RGB(0xD9E1F2));

    let columns: Vec<ImportColumn> = ImportColumn::exported().collect();
    for (col, column) in columns.iter().enumerate() {
        let label = column.export_label().unwrap_or_default();
        sheet.write_string_with_format(0, col as u16, label, &header_format)?;
    }

    for (index, record) in records.iter().enumerate() {
        let row = (index + 1) as u32;
        for (col, column) in columns.iter().enumerate() {
            write_cell(sheet, row, col as u16, *column, record, program_names)?;
        }
    }

    sheet.set_freeze_panes(1, 0)?;
    sheet.autofit();

    workbook.save_to_buffer()
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    column: ImportColumn,
    record: &AlumniRecord,
    program_names: &HashMap<i64, String>,
) -> Result<(), XlsxError> {
    let fields = &record.fields;

    let text: Option<&str> = match column {
        ImportColumn::StudentNumber => Some(&fields.student_number),
        ImportColumn::Email => fields.email.as_deref(),
        ImportColumn::Program => fields
            .program_id
            .and_then(|id| program_names.get(&id))
            .map(String::as_str),
        ImportColumn::LastName => Some(&fields.last_name),
        ImportColumn::GivenName => Some(&fields.given_name),
        ImportColumn::MiddleInitial => fields.middle_initial.as_deref(),
        ImportColumn::Sex => fields.sex.as_deref(),
        ImportColumn::PresentAddress => fields.present_address.as_deref(),
        ImportColumn::ContactNumber => fields.contact_number.as_deref(),
        ImportColumn::EmploymentStatus => fields.employment_status.as_deref(),
        ImportColumn::CompanyName => fields.company_name.as_deref(),
        ImportColumn::FurtherStudies => fields.further_studies.as_deref(),
        ImportColumn::Sector => fields.sector.as_deref(),
        ImportColumn::WorkLocation => fields.work_location.as_deref(),
        ImportColumn::EmployerClassification => fields.employer_classification.as_deref(),
        ImportColumn::RelatedToCourse => fields.related_to_course.as_deref(),
        ImportColumn::Consent => Some(if fields.consent { "Yes" } else { "No" }),

        // Numeric columns: absent stays a blank cell, never 0
        ImportColumn::GraduationYear => {
            if let Some(year) = fields.graduation_year {
                sheet.write_number(row, col, year as f64)?;
            }
            return Ok(());
        }
        ImportColumn::InstructionRating => {
            if let Some(rating) = fields.instruction_rating {
                sheet.write_number(row, col, rating as f64)?;
            }
            return Ok(());
        }
    };

    if let Some(text) = text.filter(|t| !t.is_empty()) {
        sheet.write_string(row, col, text)?;
    }
    Ok(())
}
