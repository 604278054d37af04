//! HTTP API handlers for alumtrack-ie

pub mod alumni;
pub mod export;
pub mod health;
pub mod import;
pub mod programs;
pub mod sse;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::AppState;

pub use health::health_routes;

/// Import, export and record lifecycle routes
pub fn alumni_routes() -> Router<AppState> {
    Router::new()
        .route("/api/alumni", post(alumni::create_alumni))
        .route("/api/alumni/import", post(import::import_alumni))
        .route("/api/alumni/export", get(export::export_alumni))
        .route("/api/alumni/bulk-delete", post(alumni::bulk_delete_alumni))
        .route(
            "/api/alumni/:student_number",
            get(alumni::get_alumni).put(alumni::update_alumni),
        )
}

pub fn program_routes() -> Router<AppState> {
    Router::new()
        .route("/api/programs", get(programs::list_programs))
        .route("/api/programs/:id", delete(programs::delete_program))
}

pub fn event_routes() -> Router<AppState> {
    Router::new().route("/events", get(sse::event_stream))
}
