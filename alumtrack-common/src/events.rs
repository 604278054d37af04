//! Event types for the alumtrack notification channel
//!
//! Dashboards learn about new and changed alumni records through these
//! events. Delivery is best effort: emitters never wait on or fail because
//! of subscribers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Which write path produced a record change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    /// Alumnus submitted or updated their own survey
    SelfService,
    /// Administrator added the record by hand
    Administrative,
    /// Row of a bulk spreadsheet import
    BulkImport,
}

/// Alumtrack event types
///
/// Serialized with a `type` tag for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AlumtrackEvent {
    /// A single alumni record was created or updated
    AlumniRecordSaved {
        record_id: i64,
        student_number: String,
        /// false when an existing record was overwritten
        created: bool,
        source: RecordSource,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A bulk import finished (possibly with row errors)
    AlumniImportCompleted {
        batch_id: Uuid,
        imported: usize,
        created: usize,
        updated: usize,
        failed: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Administrative bulk delete removed records
    AlumniRecordsDeleted {
        count: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl AlumtrackEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            AlumtrackEvent::AlumniRecordSaved { .. } => "AlumniRecordSaved",
            AlumtrackEvent::AlumniImportCompleted { .. } => "AlumniImportCompleted",
            AlumtrackEvent::AlumniRecordsDeleted { .. } => "AlumniRecordsDeleted",
        }
    }
}

/// Broadcast bus for [`AlumtrackEvent`]s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AlumtrackEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per lagging
    /// subscriber before the oldest are dropped
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<AlumtrackEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: AlumtrackEvent,
    ) -> Result<usize, broadcast::error::SendError<AlumtrackEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: AlumtrackEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::trace!("No subscribers for {}", e.0.event_type());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
