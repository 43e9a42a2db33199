//! Billing provider integration.
//!
//! `BillingApi` is the read/create seam to the provider: the reconciler uses
//! it to expand incomplete webhook payloads, the checkout endpoint uses it to
//! start a session. Tests substitute a stub; production wires `StripeClient`.

pub mod stripe;

pub use stripe::{verify_webhook_signature, StripeClient};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Plan (price) details attached to a subscription or checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanDetail {
    /// Provider price id ("price_...")
    pub plan_id: String,
    /// Provider product id ("prod_...")
    pub product_id: Option<String>,
    /// "month" / "year"; absent for one-time prices
    pub billing_interval: Option<String>,
    pub unit_amount: Option<i64>,
}

/// Subscription detail fetched from the provider API.
#[derive(Debug, Clone)]
pub struct SubscriptionDetail {
    pub id: String,
    pub customer: Option<String>,
    pub status: String,
    pub current_period_end: Option<i64>,
    pub cancel_at_period_end: bool,
    pub plan: Option<PlanDetail>,
}

/// Customer detail fetched from the provider API.
#[derive(Debug, Clone)]
pub struct CustomerDetail {
    pub id: String,
    pub email: Option<String>,
}

/// Request to create a hosted checkout session.
#[derive(Debug, Deserialize)]
pub struct CreateCheckoutSession {
    pub price_id: String,
    /// Internal account id, stored as client_reference_id and metadata so
    /// the completion webhook resolves without heuristics.
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Read-only (plus checkout creation) interface to the billing provider.
///
/// Lookup failures surface as `AppError::Upstream` and are non-fatal to
/// reconciliation: the caller degrades to whatever fields were inline in
/// the event.
#[async_trait]
pub trait BillingApi: Send + Sync {
    async fn get_subscription(&self, subscription_id: &str) -> Result<SubscriptionDetail>;

    async fn get_customer(&self, customer_id: &str) -> Result<CustomerDetail>;

    /// Fetch the first line item of a checkout session, for sessions whose
    /// webhook payload doesn't carry plan details inline.
    async fn expand_checkout_line_items(&self, session_id: &str) -> Result<Option<PlanDetail>>;

    async fn create_checkout_session(
        &self,
        request: &CreateCheckoutSession,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession>;
}
