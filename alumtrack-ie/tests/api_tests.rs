//! HTTP API integration tests (router driven in-process)

mod helpers;

use alumtrack_common::config::ImportConfig;
use alumtrack_common::events::AlumtrackEvent;
use alumtrack_ie::build_router;
use alumtrack_ie::import::ImportColumn;
use axum::http::{header, StatusCode};
use helpers::{body_bytes, body_json, get, json_request, multipart_upload, sheet, xlsx, AlumniRow, TestDb};
use serde_json::json;
use tower::ServiceExt;

fn sample_upload() -> Vec<u8> {
    xlsx(&sheet(&[
        AlumniRow::new("2018-0001", "Reyes", "Ana")
            .with(ImportColumn::Email, "ana@example.edu")
            .with(ImportColumn::Program, "BSIT")
            .with(ImportColumn::Consent, "Yes"),
        AlumniRow::new("2018-0002", "Cruz", "").with(ImportColumn::Program, "BSIT"),
        AlumniRow::new("2018-0003", "Lim", "Carla").with(ImportColumn::Program, "BSN"),
    ]))
}

#[tokio::test]
async fn test_health_reports_ok() {
    let db = TestDb::new().await;
    let app = build_router(db.state(ImportConfig::default()));

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "alumtrack-ie");
    assert_eq!(body["alumni_count"], 0);
    assert!(body["last_import_error"].is_null());
}

#[tokio::test]
async fn test_health_degraded_when_database_unavailable() {
    let db = TestDb::new().await;
    let app = build_router(db.state(ImportConfig::default()));
    db.pool.close().await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert!(body["alumni_count"].is_null());
}

#[tokio::test]
async fn test_import_reports_partial_success() {
    let db = TestDb::new().await;
    let app = build_router(db.state(ImportConfig::default()));

    let response = app
        .oneshot(multipart_upload("/api/alumni/import", "alumni.xlsx", &sample_upload()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["imported"], 2);
    assert_eq!(body["created"], 2);
    assert_eq!(body["errors"][0], "Row 3: Missing required field: given_name");
    assert!(body["message"].as_str().unwrap().starts_with("Imported 2 record(s)"));
}

#[tokio::test]
async fn test_import_rejects_unsupported_type() {
    let db = TestDb::new().await;
    let app = build_router(db.state(ImportConfig::default()));

    let response = app
        .oneshot(multipart_upload("/api/alumni/import", "alumni.pdf", b"%PDF-1.4"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNPROCESSABLE");
}

#[tokio::test]
async fn test_import_rejects_header_only_file() {
    let db = TestDb::new().await;
    let app = build_router(db.state(ImportConfig::default()));

    let response = app
        .oneshot(multipart_upload("/api/alumni/import", "alumni.xlsx", &xlsx(&sheet(&[]))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_import_limits() {
    let db = TestDb::new().await;

    let small = ImportConfig {
        max_upload_bytes: 100,
        ..Default::default()
    };
    let response = build_router(db.state(small))
        .oneshot(multipart_upload("/api/alumni/import", "alumni.xlsx", &sample_upload()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let few_rows = ImportConfig {
        max_rows: 2,
        ..Default::default()
    };
    let response = build_router(db.state(few_rows))
        .oneshot(multipart_upload("/api/alumni/import", "alumni.xlsx", &sample_upload()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_unreadable_file_is_internal_error_with_safe_message() {
    let db = TestDb::new().await;
    let state = db.state(ImportConfig::default());
    let app = build_router(state.clone());

    let response = app
        .oneshot(multipart_upload("/api/alumni/import", "alumni.xlsx", b"this is not a zip"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(
        body["error"]["message"],
        "The uploaded file could not be read as a spreadsheet"
    );
    assert!(state.last_import_failure().is_some());
}

#[tokio::test]
async fn test_import_requires_file_field() {
    let db = TestDb::new().await;
    let app = build_router(db.state(ImportConfig::default()));

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/alumni/import")
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=x")
        .body(axum::body::Body::from("--x--\r\n"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_export_download_and_empty_selection() {
    let db = TestDb::new().await;
    let state = db.state(ImportConfig::default());

    let response = build_router(state.clone())
        .oneshot(get("/api/alumni/export"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    build_router(state.clone())
        .oneshot(multipart_upload("/api/alumni/import", "alumni.xlsx", &sample_upload()))
        .await
        .unwrap();

    let response = build_router(state.clone())
        .oneshot(get("/api/alumni/export?ids="))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"alumni_tracer_export.xlsx\""
    );
    let bytes = body_bytes(response).await;
    assert!(bytes.starts_with(b"PK"));

    let response = build_router(state)
        .oneshot(get("/api/alumni/export?ids=12345"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manual_add_lookup_and_conflict() {
    let db = TestDb::new().await;
    let state = db.state(ImportConfig::default());
    let payload = json!({
        "student_number": "2021-0042",
        "last_name": "Garcia",
        "given_name": "Iris",
        "program": "bs psychology",
        "employment_status": "Unemployed",
        "company_name": "Leftover Ltd",
        "instruction_rating": 4,
        "consent": true
    });

    let response = build_router(state.clone())
        .oneshot(json_request("POST", "/api/alumni", payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["student_number"], "2021-0042");
    assert!(created["company_name"].is_null());

    let response = build_router(state.clone())
        .oneshot(json_request("POST", "/api/alumni", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = build_router(state.clone())
        .oneshot(get("/api/alumni/2021-0042"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["instruction_rating"], 4);

    let response = build_router(state)
        .oneshot(get("/api/alumni/1999-0000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_always_applies_employment_rule() {
    let db = TestDb::new().await;
    let config = ImportConfig {
        employment_normalization: alumtrack_common::config::EmploymentNormalization::UpdateOnly,
        ..Default::default()
    };
    let state = db.state(config);

    build_router(state.clone())
        .oneshot(json_request(
            "POST",
            "/api/alumni",
            json!({"student_number": "2021-0050", "last_name": "Diaz", "given_name": "Jo"}),
        ))
        .await
        .unwrap();

    let response = build_router(state.clone())
        .oneshot(json_request(
            "PUT",
            "/api/alumni/2021-0050",
            json!({
                "last_name": "Diaz",
                "given_name": "Jo",
                "employment_status": "Self-employed",
                "company_name": "Own Shop",
                "program": {"name": "BSBA"}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["company_name"].is_null());
    assert!(body["program_id"].is_i64());

    let response = build_router(state)
        .oneshot(json_request(
            "PUT",
            "/api/alumni/2021-9999",
            json!({"last_name": "X", "given_name": "Y"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bulk_delete_and_event() {
    let db = TestDb::new().await;
    let state = db.state(ImportConfig::default());
    let mut events = state.event_bus.subscribe();

    build_router(state.clone())
        .oneshot(multipart_upload("/api/alumni/import", "alumni.xlsx", &sample_upload()))
        .await
        .unwrap();
    let ana = build_router(state.clone())
        .oneshot(get("/api/alumni/2018-0001"))
        .await
        .unwrap();
    let id = body_json(ana).await["id"].as_i64().unwrap();

    let response = build_router(state.clone())
        .oneshot(json_request("POST", "/api/alumni/bulk-delete", json!({"ids": [id, 424242]})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["deleted"], 1);

    let mut saw_import = false;
    let mut saw_delete = false;
    while let Ok(event) = events.try_recv() {
        match event {
            AlumtrackEvent::AlumniImportCompleted { imported, .. } => {
                assert_eq!(imported, 2);
                saw_import = true;
            }
            AlumtrackEvent::AlumniRecordsDeleted { count, .. } => {
                assert_eq!(count, 1);
                saw_delete = true;
            }
            AlumtrackEvent::AlumniRecordSaved { .. } => {}
        }
    }
    assert!(saw_import && saw_delete);
}

#[tokio::test]
async fn test_program_delete_blocked_while_referenced() {
    let db = TestDb::new().await;
    let state = db.state(ImportConfig::default());

    build_router(state.clone())
        .oneshot(multipart_upload("/api/alumni/import", "alumni.xlsx", &sample_upload()))
        .await
        .unwrap();

    let response = build_router(state.clone())
        .oneshot(get("/api/programs"))
        .await
        .unwrap();
    let programs = body_json(response).await;
    let bsit_id = programs
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "BSIT")
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let delete = |id: i64| {
        axum::http::Request::builder()
            .method("DELETE")
            .uri(format!("/api/programs/{}", id))
            .body(axum::body::Body::empty())
            .unwrap()
    };

    let response = build_router(state.clone()).oneshot(delete(bsit_id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = build_router(state).oneshot(delete(987_654)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
