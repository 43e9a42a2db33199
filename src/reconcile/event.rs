use crate::error::{AppError, Result};
use crate::payments::stripe::{StripeCheckoutSession, StripeEvent, StripeInvoice, StripeSubscription};

/// A billing lifecycle event, narrowed to the variants the reconciler
/// handles. Adding a new event type means adding a variant here and a
/// merge arm in the reconciler - a compile-time-checked decision, not an
/// open-ended string switch.
#[derive(Debug)]
pub enum BillingEvent {
    /// checkout.session.completed
    CheckoutCompleted(StripeCheckoutSession),
    /// customer.subscription.created / customer.subscription.updated
    SubscriptionChanged(StripeSubscription),
    /// customer.subscription.deleted
    SubscriptionDeleted(StripeSubscription),
    /// invoice.payment_failed
    PaymentFailed(StripeInvoice),
    /// Event type not relevant to account state - logged, never merged
    Ignored,
}

impl BillingEvent {
    pub fn parse(event: &StripeEvent) -> Result<Self> {
        match event.event_type.as_str() {
            "checkout.session.completed" => {
                let session: StripeCheckoutSession =
                    serde_json::from_value(event.data.object.clone()).map_err(|e| {
                        tracing::error!("Failed to parse checkout session: {}", e);
                        AppError::BadRequest("Invalid checkout session".into())
                    })?;
                Ok(Self::CheckoutCompleted(session))
            }
            "customer.subscription.created" | "customer.subscription.updated" => {
                let sub: StripeSubscription = serde_json::from_value(event.data.object.clone())
                    .map_err(|e| {
                        tracing::error!("Failed to parse subscription: {}", e);
                        AppError::BadRequest("Invalid subscription".into())
                    })?;
                Ok(Self::SubscriptionChanged(sub))
            }
            "customer.subscription.deleted" => {
                let sub: StripeSubscription = serde_json::from_value(event.data.object.clone())
                    .map_err(|e| {
                        tracing::error!("Failed to parse subscription: {}", e);
                        AppError::BadRequest("Invalid subscription".into())
                    })?;
                Ok(Self::SubscriptionDeleted(sub))
            }
            "invoice.payment_failed" => {
                let invoice: StripeInvoice = serde_json::from_value(event.data.object.clone())
                    .map_err(|e| {
                        tracing::error!("Failed to parse invoice: {}", e);
                        AppError::BadRequest("Invalid invoice".into())
                    })?;
                Ok(Self::PaymentFailed(invoice))
            }
            _ => Ok(Self::Ignored),
        }
    }
}
