//! Tabular decoding of uploaded spreadsheets
//!
//! Turns xlsx/xls/csv bytes into rows of optional string cells. Nothing here
//! knows about alumni; column meaning is assigned later by `ColumnLayout`.

use std::io::Cursor;

use calamine::{Data, Range, Reader, Xls, Xlsx};
use thiserror::Error;

/// Batch-fatal decoding failures
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unsupported file type: {0} (expected .xlsx, .xls or .csv)")]
    UnsupportedFormat(String),

    #[error("Failed to read xlsx workbook: {0}")]
    Xlsx(#[from] calamine::XlsxError),

    #[error("Failed to read xls workbook: {0}")]
    Xls(#[from] calamine::XlsError),

    #[error("Failed to read csv file: {0}")]
    Csv(#[from] csv::Error),

    #[error("No data rows found after the header row")]
    Empty,
}

impl DecodeError {
    /// Caller supplied something we will never be able to import
    pub fn is_user_error(&self) -> bool {
        matches!(self, DecodeError::UnsupportedFormat(_) | DecodeError::Empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    Xlsx,
    Xls,
    Csv,
}

impl SpreadsheetFormat {
    /// Detect the format from the upload's file name extension
    pub fn from_file_name(file_name: &str) -> Result<Self, DecodeError> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.trim().to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" => Ok(SpreadsheetFormat::Xlsx),
            "xls" => Ok(SpreadsheetFormat::Xls),
            "csv" => Ok(SpreadsheetFormat::Csv),
            _ => Err(DecodeError::UnsupportedFormat(file_name.to_string())),
        }
    }
}

/// One decoded row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based row number as shown by spreadsheet software
    pub line: usize,
    pub cells: Vec<Option<String>>,
}

impl RawRow {
    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).and_then(|c| c.as_deref())
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }
}

/// Fully decoded rows, consumed once in file order
#[derive(Debug)]
pub struct RowStream {
    rows: std::vec::IntoIter<RawRow>,
}

impl RowStream {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows: rows.into_iter() }
    }
}

impl Iterator for RowStream {
    type Item = RawRow;

    fn next(&mut self) -> Option<RawRow> {
        self.rows.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for RowStream {}

/// Decode a whole upload
pub fn decode(bytes: &[u8], format: SpreadsheetFormat) -> Result<RowStream, DecodeError> {
    let rows = match format {
        SpreadsheetFormat::Xlsx => {
            let mut workbook = Xlsx::new(Cursor::new(bytes))?;
            match workbook.sheet_names().first().cloned() {
                Some(name) => range_to_rows(&workbook.worksheet_range(&name)?),
                None => Vec::new(),
            }
        }
        SpreadsheetFormat::Xls => {
            let mut workbook = Xls::new(Cursor::new(bytes))?;
            match workbook.sheet_names().first().cloned() {
                Some(name) => range_to_rows(&workbook.worksheet_range(&name)?),
                None => Vec::new(),
            }
        }
        SpreadsheetFormat::Csv => decode_csv(bytes)?,
    };

    tracing::debug!(?format, rows = rows.len(), "Decoded spreadsheet");
    Ok(RowStream::new(rows))
}

fn range_to_rows(range: &Range<Data>) -> Vec<RawRow> {
    let (start_row, start_col) = range.start().unwrap_or((0, 0));

    range
        .rows()
        .enumerate()
        .map(|(i, row)| {
            let mut cells: Vec<Option<String>> = vec![None; start_col as usize];
            cells.extend(row.iter().map(cell_text));
            RawRow {
                line: start_row as usize + i + 1,
                cells,
            }
        })
        .collect()
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => non_blank(s),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(format_float(*f)),
        Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => Some(format_float(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => non_blank(s),
    }
}

/// "2020" rather than "2020.0" for integral values
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}

fn non_blank(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn decode_csv(bytes: &[u8]) -> Result<Vec<RawRow>, DecodeError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    // Excel on Windows still saves "CSV" as Windows-1252
    let content = match std::str::from_utf8(bytes) {
        Ok(s) => std::borrow::Cow::Borrowed(s),
        Err(_) => {
            tracing::debug!("CSV upload is not UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded
        }
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(index + 1);
        rows.push(RawRow {
            line,
            cells: record.iter().map(non_blank).collect(),
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn collect(stream: RowStream) -> Vec<RawRow> {
        stream.collect()
    }

    #[test]
    fn test_format_from_file_name() {
        assert_eq!(SpreadsheetFormat::from_file_name("alumni.xlsx").unwrap(), SpreadsheetFormat::Xlsx);
        assert_eq!(SpreadsheetFormat::from_file_name("ALUMNI.XLS").unwrap(), SpreadsheetFormat::Xls);
        assert_eq!(SpreadsheetFormat::from_file_name("batch 2.Csv").unwrap(), SpreadsheetFormat::Csv);
        assert!(matches!(
            SpreadsheetFormat::from_file_name("alumni.pdf"),
            Err(DecodeError::UnsupportedFormat(_))
        ));
        assert!(SpreadsheetFormat::from_file_name("noextension").is_err());
    }

    #[test]
    fn test_csv_rows_and_blank_cells() {
        let data = b"student_number,email,program\n2019-001, ,BSIT\n2019-002,b@x.edu\n";
        let rows = collect(decode(data, SpreadsheetFormat::Csv).unwrap());

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].line, 1);
        assert_eq!(rows[1].line, 2);
        assert_eq!(rows[1].cell(0), Some("2019-001"));
        assert_eq!(rows[1].cell(1), None);
        assert_eq!(rows[1].cell(2), Some("BSIT"));
        // Short record is allowed
        assert_eq!(rows[2].cells.len(), 2);
        assert_eq!(rows[2].cell(5), None);
    }

    #[test]
    fn test_csv_bom_is_stripped() {
        let data = b"\xEF\xBB\xBFstudent_number\n2019-001\n";
        let rows = collect(decode(data, SpreadsheetFormat::Csv).unwrap());
        assert_eq!(rows[0].cell(0), Some("student_number"));
    }

    #[test]
    fn test_csv_windows_1252_fallback() {
        // "Peña" with 0xF1 for ñ
        let data = b"2019-001,Pe\xF1a\n";
        let rows = collect(decode(data, SpreadsheetFormat::Csv).unwrap());
        assert_eq!(rows[0].cell(1), Some("Peña"));
    }

    #[test]
    fn test_xlsx_cells_are_stringified() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "student_number").unwrap();
        sheet.write_string(1, 0, "2019-001").unwrap();
        sheet.write_number(1, 1, 2020.0).unwrap();
        sheet.write_number(1, 2, 4.5).unwrap();
        sheet.write_boolean(1, 3, true).unwrap();
        sheet.write_string(1, 4, "   ").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let rows = collect(decode(&bytes, SpreadsheetFormat::Xlsx).unwrap());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].line, 2);
        assert_eq!(rows[1].cell(0), Some("2019-001"));
        assert_eq!(rows[1].cell(1), Some("2020"));
        assert_eq!(rows[1].cell(2), Some("4.5"));
        assert_eq!(rows[1].cell(3), Some("TRUE"));
        assert_eq!(rows[1].cell(4), None);
    }

    #[test]
    fn test_xlsx_offset_range_keeps_positions() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(2, 1, "header").unwrap();
        sheet.write_string(3, 1, "value").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let rows = collect(decode(&bytes, SpreadsheetFormat::Xlsx).unwrap());
        assert_eq!(rows[0].line, 3);
        assert_eq!(rows[0].cell(0), None);
        assert_eq!(rows[0].cell(1), Some("header"));
        assert_eq!(rows[1].line, 4);
    }

    #[test]
    fn test_garbage_xlsx_fails() {
        let result = decode(b"not a zip archive", SpreadsheetFormat::Xlsx);
        assert!(matches!(result, Err(DecodeError::Xlsx(_))));
    }

    #[test]
    fn test_stream_is_exact_size() {
        let stream = decode(b"a\nb\nc\n", SpreadsheetFormat::Csv).unwrap();
        assert_eq!(stream.len(), 3);
    }
}
