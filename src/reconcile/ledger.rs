//! Idempotency ledger: the durable record of every event ever received,
//! keyed by the provider's event id.
//!
//! Failure semantics are deliberately asymmetric. `record_received` is
//! best-effort: reconciliation is the behavior that matters, so a failed
//! audit write is logged and processing continues. `mark_processed` failure
//! is more serious (redelivery would reprocess), so it propagates and the
//! dispatch loop answers with a retryable status; the reconciler's
//! idempotent merges make that degradation safe.

use crate::db::{queries, AppState};
use crate::error::Result;
use crate::models::RecordEvent;

/// Upsert the event into the ledger. Never fails the dispatch: a write
/// error is logged and swallowed.
pub fn record_received(state: &AppState, event: &RecordEvent) {
    let result = state
        .ledger
        .get()
        .map_err(Into::into)
        .and_then(|conn| queries::record_event(&conn, event));

    if let Err(e) = result {
        tracing::warn!("Failed to record event {} in ledger: {}", event.id, e);
    }
}

/// Whether the event has already been fully reconciled.
///
/// A ledger read failure degrades to "not processed": reprocessing is safe
/// because merges are idempotent, whereas skipping on a false positive
/// would drop the event entirely.
pub fn is_processed(state: &AppState, event_id: &str) -> bool {
    let result = state
        .ledger
        .get()
        .map_err(Into::into)
        .and_then(|conn| queries::is_event_processed(&conn, event_id));

    match result {
        Ok(processed) => processed,
        Err(e) => {
            tracing::warn!("Ledger dedup check failed for {}: {}", event_id, e);
            false
        }
    }
}

/// Mark the event fully reconciled. Called only after the reconciler
/// completed successfully; a failure here propagates so the provider
/// redelivers.
pub fn mark_processed(state: &AppState, event_id: &str) -> Result<()> {
    let conn = state.ledger.get()?;
    queries::mark_event_processed(&conn, event_id)
}
