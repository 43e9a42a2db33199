use serde::{Deserialize, Serialize};

/// A billing event as recorded in the idempotency ledger.
///
/// Immutable once stored, except `processed_at` which is set exactly once
/// after the reconciler finishes applying the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Provider-assigned event id ("evt_..."), globally unique.
    pub id: String,
    pub event_type: String,
    /// Provider-side creation timestamp (Unix seconds).
    pub created_at: i64,
    /// Opaque JSON snapshot of the event's data object.
    pub payload: String,
    pub received_at: i64,
    pub processed_at: Option<i64>,
}

/// Input for recording a newly received event.
#[derive(Debug)]
pub struct RecordEvent {
    pub id: String,
    pub event_type: String,
    pub created_at: i64,
    pub payload: String,
}
