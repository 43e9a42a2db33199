use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Subscription status as reported by the billing provider.
///
/// `Unknown` absorbs statuses the provider adds that we do not model;
/// an unknown status is stored and served as-is rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// No subscription activity recorded yet.
    None,
    Trialing,
    Active,
    PastDue,
    Canceled,
    Unpaid,
    /// A completed one-time (payment mode) checkout.
    Complete,
    Unknown,
}

impl FromStr for SubscriptionStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "none" => Self::None,
            "trialing" => Self::Trialing,
            "active" => Self::Active,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            "unpaid" => Self::Unpaid,
            "complete" => Self::Complete,
            _ => Self::Unknown,
        })
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Unpaid => "unpaid",
            Self::Complete => "complete",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

impl SubscriptionStatus {
    /// Whether this status currently grants access.
    pub fn has_access(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing | Self::Complete)
    }
}

/// Subscription state merged onto an account by the reconciler.
///
/// Every field except `status` and flags is optional: webhook events carry
/// partial snapshots and merges never clear a field they don't mention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionState {
    pub status: SubscriptionStatus,
    /// Provider price id (e.g. "price_...")
    pub plan_id: Option<String>,
    /// Provider product id (e.g. "prod_...")
    pub product_id: Option<String>,
    /// Billing interval ("month", "year")
    pub billing_interval: Option<String>,
    /// Price in the smallest currency unit
    pub unit_amount: Option<i64>,
    /// Provider subscription id (e.g. "sub_...")
    pub subscription_id: Option<String>,
    /// Checkout session id that initiated this subscription (e.g. "cs_...")
    pub session_id: Option<String>,
    /// Checkout mode: "payment" or "subscription"
    pub mode: Option<String>,
    pub current_period_end: Option<i64>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<i64>,
    pub last_payment_failed_at: Option<i64>,
    /// Processing time of the last applied event for this account.
    /// Deliberately NOT the event's own timestamp - events arrive out of
    /// provider-side order.
    pub updated_at: i64,
}

/// Internal account. Created by the signup flow; the reconciler only
/// ever mutates `billing_customer_id` and `subscription`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: Option<String>,
    /// Provider customer id ("cus_..."), persisted once discovered so later
    /// events resolve without falling back to email matching.
    pub billing_customer_id: Option<String>,
    pub subscription: SubscriptionState,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccount {
    pub email: Option<String>,
    #[serde(default)]
    pub billing_customer_id: Option<String>,
}

/// Partial-field update applied to an account's subscription state.
///
/// `None` means "leave the stored value untouched". Applying the same
/// patch twice yields the same state, which is what makes redelivered
/// events safe to reprocess.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionPatch {
    pub billing_customer_id: Option<String>,
    pub status: Option<SubscriptionStatus>,
    pub plan_id: Option<String>,
    pub product_id: Option<String>,
    pub billing_interval: Option<String>,
    pub unit_amount: Option<i64>,
    pub subscription_id: Option<String>,
    pub session_id: Option<String>,
    pub mode: Option<String>,
    pub current_period_end: Option<i64>,
    pub cancel_at_period_end: Option<bool>,
    pub canceled_at: Option<i64>,
    pub last_payment_failed_at: Option<i64>,
}
