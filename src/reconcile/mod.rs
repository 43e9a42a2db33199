//! The reconciliation core: verification happens at the transport boundary;
//! everything from ledger logging through the final merge happens here.
//!
//! Per-event state machine, terminal on every branch:
//! received -> dedup -> (duplicate: ack) | (resolve -> reconcile ->
//! mark-processed -> ack). Resolution failure acks (redelivery would not
//! help); reconcile/mark failures report retryable so the provider
//! redelivers - the only retry mechanism this system has.

mod event;
pub mod ledger;
pub mod reconciler;
mod resolver;

pub use event::BillingEvent;
pub use resolver::{resolve, ResolutionHints};

use crate::db::AppState;
use crate::error::Result;
use crate::models::RecordEvent;
use crate::payments::stripe::StripeEvent;

/// Terminal acknowledgment outcome for one event. Every variant maps to an
/// HTTP 200 - the provider should not redeliver any of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Event reconciled and marked processed
    Applied,
    /// Ledger says this event was already fully processed
    Duplicate,
    /// No account matched the event's hints - logged and skipped
    Unresolved,
    /// Event type is not relevant to account state
    Ignored,
}

impl DispatchOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Applied => "OK",
            Self::Duplicate => "Already processed",
            Self::Unresolved => "No matching account",
            Self::Ignored => "Event ignored",
        }
    }
}

/// Process one verified event end to end.
///
/// Errors returned here are retryable by contract: the transport layer maps
/// them to a 5xx so the provider redelivers later.
pub async fn dispatch(state: &AppState, event: &StripeEvent) -> Result<DispatchOutcome> {
    // Log the raw event for audit/debug. Best-effort by design.
    ledger::record_received(
        state,
        &RecordEvent {
            id: event.id.clone(),
            event_type: event.event_type.clone(),
            created_at: event.created,
            payload: event.data.object.to_string(),
        },
    );

    if ledger::is_processed(state, &event.id) {
        tracing::info!("Skipping already-processed event {}", event.id);
        return Ok(DispatchOutcome::Duplicate);
    }

    let parsed = BillingEvent::parse(event)?;

    if matches!(parsed, BillingEvent::Ignored) {
        tracing::info!("Unhandled event type: {} ({})", event.event_type, event.id);
        // Trivially reconciled - a redelivery can short-circuit at dedup.
        ledger::mark_processed(state, &event.id)?;
        return Ok(DispatchOutcome::Ignored);
    }

    let mut hints = reconciler::resolution_hints(&parsed);

    let account = {
        let conn = state.db.get()?;
        let mut found = resolve(&conn, &hints)?;

        // Events that carry only a customer id (subscriptions, invoices) can
        // still match by email once we ask the provider who the customer is.
        // An upstream failure degrades to unresolved, never to a retry.
        if found.is_none() && hints.email.is_none() {
            if let Some(customer_id) = hints.billing_customer_id.clone() {
                match state.billing.get_customer(&customer_id).await {
                    Ok(customer) => {
                        if customer.email.is_some() {
                            hints.email = customer.email;
                            found = resolve(&conn, &hints)?;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Could not retrieve customer {}: {}", customer_id, e);
                    }
                }
            }
        }

        found
    };

    let Some(account) = account else {
        tracing::warn!(
            "Event {} ({}) matched no account: {:?}",
            event.id,
            event.event_type,
            hints
        );
        return Ok(DispatchOutcome::Unresolved);
    };

    reconciler::apply(state, &account, &parsed).await?;

    ledger::mark_processed(state, &event.id)?;

    tracing::info!(
        "Reconciled event {} ({}) into account {}",
        event.id,
        event.event_type,
        account.id
    );

    Ok(DispatchOutcome::Applied)
}
