//! Per-event-type merge handlers.
//!
//! Each handler extracts the fields its event carries and merges them into
//! the resolved account as a partial upsert: unspecified fields are left
//! untouched, never cleared. Merging identical values twice yields the same
//! state, which is what lets the dispatch loop tolerate redeliveries that
//! slip past the ledger's best-effort dedup.

use crate::db::{queries, AppState};
use crate::error::Result;
use crate::models::{Account, SubscriptionPatch, SubscriptionStatus};
use crate::payments::stripe::{StripeCheckoutSession, StripeInvoice, StripeSubscription};
use crate::payments::PlanDetail;
use crate::reconcile::BillingEvent;

/// Apply one parsed event to a resolved account.
///
/// Store write errors propagate (retryable); upstream lookup errors degrade
/// to whatever fields were inline in the event.
pub async fn apply(state: &AppState, account: &Account, event: &BillingEvent) -> Result<()> {
    let patch = match event {
        BillingEvent::CheckoutCompleted(session) => checkout_patch(state, session).await,
        BillingEvent::SubscriptionChanged(sub) => subscription_patch(sub),
        BillingEvent::SubscriptionDeleted(sub) => deletion_patch(sub),
        BillingEvent::PaymentFailed(invoice) => payment_failed_patch(invoice),
        BillingEvent::Ignored => return Ok(()),
    };

    let conn = state.db.get()?;
    let updated = queries::apply_subscription_patch(&conn, &account.id, &patch)?;
    if !updated {
        // The account existed at resolution time; a concurrent delete is the
        // only way to get here. Nothing to merge into - ack, don't retry.
        tracing::warn!("Account {} disappeared before merge", account.id);
        return Ok(());
    }

    tracing::info!(
        "Merged event into account {}: status={:?}, subscription={:?}",
        account.id,
        patch.status,
        patch.subscription_id,
    );
    Ok(())
}

/// checkout.session.completed: the strongest signal we get. Persists the
/// customer id discovered at checkout so later events resolve directly.
async fn checkout_patch(state: &AppState, session: &StripeCheckoutSession) -> SubscriptionPatch {
    // One-time (payment mode) checkouts complete; subscription checkouts
    // activate.
    let status = match session.mode.as_deref() {
        Some("payment") => SubscriptionStatus::Complete,
        _ => SubscriptionStatus::Active,
    };

    let plan = expand_plan(state, session).await;

    SubscriptionPatch {
        billing_customer_id: session.customer.clone(),
        status: Some(status),
        plan_id: plan.as_ref().map(|p| p.plan_id.clone()),
        product_id: plan.as_ref().and_then(|p| p.product_id.clone()),
        billing_interval: plan.as_ref().and_then(|p| p.billing_interval.clone()),
        unit_amount: plan.as_ref().and_then(|p| p.unit_amount),
        subscription_id: session.subscription.clone(),
        session_id: Some(session.id.clone()),
        mode: session.mode.clone(),
        ..Default::default()
    }
}

/// Plan details for a checkout, cheapest source first: session metadata,
/// then the line-items API, then the subscription itself. Upstream failures
/// degrade to whatever was inline.
async fn expand_plan(state: &AppState, session: &StripeCheckoutSession) -> Option<PlanDetail> {
    if let Some(price_id) = &session.metadata.price_id {
        return Some(PlanDetail {
            plan_id: price_id.clone(),
            product_id: None,
            billing_interval: None,
            unit_amount: None,
        });
    }

    match state.billing.expand_checkout_line_items(&session.id).await {
        Ok(Some(plan)) => return Some(plan),
        Ok(None) => {}
        Err(e) => {
            tracing::warn!("Could not expand line items for session {}: {}", session.id, e);
        }
    }

    if let Some(subscription_id) = &session.subscription {
        match state.billing.get_subscription(subscription_id).await {
            Ok(detail) => return detail.plan,
            Err(e) => {
                tracing::warn!(
                    "Could not fetch subscription {} for plan details: {}",
                    subscription_id,
                    e
                );
            }
        }
    }

    None
}

/// customer.subscription.created / updated: full subscription snapshot.
fn subscription_patch(sub: &StripeSubscription) -> SubscriptionPatch {
    let plan = sub.plan();

    SubscriptionPatch {
        billing_customer_id: sub.customer.clone(),
        status: Some(sub.status.parse().unwrap_or(SubscriptionStatus::Unknown)),
        plan_id: plan.as_ref().map(|p| p.plan_id.clone()),
        product_id: plan.as_ref().and_then(|p| p.product_id.clone()),
        billing_interval: plan.as_ref().and_then(|p| p.billing_interval.clone()),
        unit_amount: plan.as_ref().and_then(|p| p.unit_amount),
        subscription_id: Some(sub.id.clone()),
        current_period_end: sub.current_period_end,
        cancel_at_period_end: sub.cancel_at_period_end,
        ..Default::default()
    }
}

/// customer.subscription.deleted: terminal. Only status and canceled_at
/// move; plan fields stay for record-keeping.
fn deletion_patch(sub: &StripeSubscription) -> SubscriptionPatch {
    SubscriptionPatch {
        billing_customer_id: sub.customer.clone(),
        status: Some(SubscriptionStatus::Canceled),
        canceled_at: Some(queries::now()),
        ..Default::default()
    }
}

/// invoice.payment_failed: annotate only. Status transitions (e.g. to
/// past_due) arrive via customer.subscription.updated.
fn payment_failed_patch(invoice: &StripeInvoice) -> SubscriptionPatch {
    SubscriptionPatch {
        billing_customer_id: invoice.customer.clone(),
        last_payment_failed_at: Some(queries::now()),
        ..Default::default()
    }
}

/// Hints for resolving the event to an account, strongest first.
pub fn resolution_hints(event: &BillingEvent) -> crate::reconcile::ResolutionHints {
    use crate::reconcile::ResolutionHints;

    match event {
        BillingEvent::CheckoutCompleted(session) => ResolutionHints {
            account_id: session
                .client_reference_id
                .clone()
                .or_else(|| session.metadata.uid.clone()),
            billing_customer_id: session.customer.clone(),
            email: session.email(),
        },
        BillingEvent::SubscriptionChanged(sub) | BillingEvent::SubscriptionDeleted(sub) => {
            ResolutionHints {
                account_id: sub.metadata.uid.clone(),
                billing_customer_id: sub.customer.clone(),
                email: None,
            }
        }
        BillingEvent::PaymentFailed(invoice) => ResolutionHints {
            account_id: None,
            billing_customer_id: invoice.customer.clone(),
            email: None,
        },
        BillingEvent::Ignored => ResolutionHints::default(),
    }
}
