//! Shared fixtures for alumtrack-ie integration tests
//!
//! - Temporary databases with the real schema
//! - Spreadsheet builders (xlsx via rust_xlsxwriter, csv as text)
//! - Multipart request and JSON body helpers for router tests

#![allow(dead_code)]

use alumtrack_common::config::ImportConfig;
use alumtrack_common::db::init_database;
use alumtrack_common::events::EventBus;
use alumtrack_ie::import::ImportColumn;
use alumtrack_ie::store::SqliteStore;
use alumtrack_ie::AppState;
use axum::body::Body;
use axum::http::{header, Request, Response};
use http_body_util::BodyExt;
use rust_xlsxwriter::Workbook;
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Keep the `TempDir` alive for as long as the pool is used
pub struct TestDb {
    pub dir: TempDir,
    pub pool: SqlitePool,
}

impl TestDb {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("alumtrack.db")).await.unwrap();
        Self { dir, pool }
    }

    pub fn store(&self) -> SqliteStore {
        SqliteStore::new(self.pool.clone(), 2_000)
    }

    pub fn state(&self, config: ImportConfig) -> AppState {
        AppState::new(self.pool.clone(), EventBus::new(64), config)
    }
}

/// Template header row (column keys in positional order)
pub fn template_header() -> Vec<String> {
    ImportColumn::ALL.iter().map(|c| c.key().to_string()).collect()
}

/// One data row in template order
#[derive(Debug, Clone)]
pub struct AlumniRow {
    cells: Vec<String>,
}

impl AlumniRow {
    pub fn new(student_number: &str, last_name: &str, given_name: &str) -> Self {
        Self {
            cells: vec![String::new(); ImportColumn::ALL.len()],
        }
        .with(ImportColumn::StudentNumber, student_number)
        .with(ImportColumn::LastName, last_name)
        .with(ImportColumn::GivenName, given_name)
    }

    pub fn with(mut self, column: ImportColumn, value: &str) -> Self {
        let index = ImportColumn::ALL
            .iter()
            .position(|c| *c == column)
            .unwrap();
        self.cells[index] = value.to_string();
        self
    }

    pub fn cells(&self) -> Vec<String> {
        self.cells.clone()
    }
}

/// Header plus data rows
pub fn sheet(rows: &[AlumniRow]) -> Vec<Vec<String>> {
    let mut out = vec![template_header()];
    out.extend(rows.iter().map(AlumniRow::cells));
    out
}

/// First-sheet xlsx document; empty strings are left as empty cells
pub fn xlsx(rows: &[Vec<String>]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !value.is_empty() {
                worksheet.write_string(r as u32, c as u16, value).unwrap();
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

pub fn csv(rows: &[Vec<String>]) -> Vec<u8> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.write_record(row).unwrap();
    }
    writer.into_inner().unwrap()
}

const BOUNDARY: &str = "alumtrack-test-boundary";

/// POST with a single multipart `file` field
pub fn multipart_upload(uri: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
