//! alumtrack-ie library - alumni Import/Export service
//!
//! Bulk spreadsheet import with per-row reconciliation, xlsx export, and the
//! record/program administration endpoints that sit beside them.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use alumtrack_common::config::ImportConfig;
use alumtrack_common::events::EventBus;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use sqlx::SqlitePool;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod export;
pub mod import;
pub mod store;
pub mod utils;

pub use error::{ApiError, ApiResult};

use store::SqliteStore;

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Alumni and program tables over the shared pool
    pub store: SqliteStore,
    /// Record and import notifications (SSE)
    pub event_bus: EventBus,
    pub import_config: Arc<ImportConfig>,
    pub startup_time: Instant,
    /// Most recent batch-fatal import failure, reported by /health
    pub last_import_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, import_config: ImportConfig) -> Self {
        Self {
            store: SqliteStore::new(db, import_config.lock_wait_ms),
            event_bus,
            import_config: Arc::new(import_config),
            startup_time: Instant::now(),
            last_import_error: Arc::new(RwLock::new(None)),
        }
    }

    pub fn record_import_failure(&self, message: impl Into<String>) {
        if let Ok(mut slot) = self.last_import_error.write() {
            *slot = Some(message.into());
        }
    }

    pub fn last_import_failure(&self) -> Option<String> {
        self.last_import_error.read().ok().and_then(|slot| slot.clone())
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .import_config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let timeout = Duration::from_secs(state.import_config.request_timeout_secs);

    Router::new()
        .merge(api::alumni_routes().layer(DefaultBodyLimit::max(body_limit)))
        .merge(api::program_routes())
        .merge(api::event_routes())
        .merge(api::health_routes())
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
