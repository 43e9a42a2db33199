use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::payments::{
    BillingApi, CheckoutSession, CreateCheckoutSession, CustomerDetail, PlanDetail,
    SubscriptionDetail,
};

type HmacSha256 = Hmac<Sha256>;

const API_BASE: &str = "https://api.stripe.com/v1";

/// Maximum age of a webhook timestamp before it's rejected (in seconds).
/// Stripe recommends 300 seconds (5 minutes).
const WEBHOOK_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Verify a Stripe webhook signature against an ordered list of trusted
/// secrets, accepting on the first match.
///
/// Operates on the exact unparsed request body: any re-serialization before
/// this call invalidates the signature. Multiple secrets support rotation
/// (old + new secret both trusted during the overlap window) and live/test
/// dual environments.
///
/// Returns `Ok(false)` when no secret matches or the timestamp is stale;
/// errors only for malformed headers or an empty secret list.
pub fn verify_webhook_signature(
    payload: &[u8],
    signature: &str,
    secrets: &[String],
) -> Result<bool> {
    if secrets.is_empty() {
        return Err(AppError::Internal("No webhook secrets configured".into()));
    }

    // Stripe signature format: t=timestamp,v1=signature
    let mut timestamp = None;
    let mut sig_v1 = None;

    for part in signature.split(',') {
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(s) = part.strip_prefix("v1=") {
            sig_v1 = Some(s);
        }
    }

    let timestamp_str =
        timestamp.ok_or_else(|| AppError::BadRequest("Invalid signature format".into()))?;
    let sig_v1 = sig_v1.ok_or_else(|| AppError::BadRequest("Invalid signature format".into()))?;

    // Parse and validate timestamp to prevent replay attacks.
    let timestamp: i64 = timestamp_str
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid timestamp in signature".into()))?;

    let now = chrono::Utc::now().timestamp();
    let age = now - timestamp;

    if age > WEBHOOK_TIMESTAMP_TOLERANCE_SECS {
        tracing::warn!(
            "Webhook rejected: timestamp too old (age={}s, max={}s)",
            age,
            WEBHOOK_TIMESTAMP_TOLERANCE_SECS
        );
        return Ok(false);
    }

    // Also reject timestamps from the future (clock skew tolerance: 60 seconds)
    if age < -60 {
        tracing::warn!("Webhook rejected: timestamp in the future (age={}s)", age);
        return Ok(false);
    }

    let signed_payload = format!("{}.{}", timestamp_str, String::from_utf8_lossy(payload));
    let provided_bytes = sig_v1.as_bytes();

    for secret in secrets {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| AppError::Internal("Invalid webhook secret".into()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());
        let expected_bytes = expected.as_bytes();

        // Length check is not constant-time, but signature length is not
        // secret (always 64 hex chars for SHA-256). The comparison itself
        // must be constant-time to prevent timing attacks.
        if expected_bytes.len() == provided_bytes.len()
            && bool::from(expected_bytes.ct_eq(provided_bytes))
        {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Stripe API client for outbound calls: checkout session creation and the
/// read-only lookups the reconciler uses to expand incomplete payloads.
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(),
            secret_key: secret_key.to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{}", API_BASE, path))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Stripe API {} for {}: {}",
                status, path, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Stripe response: {}", e)))
    }
}

#[async_trait]
impl BillingApi for StripeClient {
    async fn get_subscription(&self, subscription_id: &str) -> Result<SubscriptionDetail> {
        let sub: StripeSubscription = self
            .get_json(&format!("/subscriptions/{}", subscription_id))
            .await?;
        Ok(SubscriptionDetail {
            plan: sub.plan(),
            id: sub.id,
            customer: sub.customer,
            status: sub.status,
            current_period_end: sub.current_period_end,
            cancel_at_period_end: sub.cancel_at_period_end.unwrap_or(false),
        })
    }

    async fn get_customer(&self, customer_id: &str) -> Result<CustomerDetail> {
        let customer: StripeCustomer = self
            .get_json(&format!("/customers/{}", customer_id))
            .await?;
        Ok(CustomerDetail {
            id: customer.id,
            email: customer.email,
        })
    }

    async fn expand_checkout_line_items(&self, session_id: &str) -> Result<Option<PlanDetail>> {
        #[derive(Deserialize)]
        struct LineItems {
            data: Vec<LineItem>,
        }
        #[derive(Deserialize)]
        struct LineItem {
            price: Option<StripePrice>,
        }

        let items: LineItems = self
            .get_json(&format!("/checkout/sessions/{}/line_items", session_id))
            .await?;
        Ok(items
            .data
            .into_iter()
            .find_map(|item| item.price)
            .map(|price| price.to_plan()))
    }

    async fn create_checkout_session(
        &self,
        request: &CreateCheckoutSession,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession> {
        #[derive(Deserialize)]
        struct CreateSessionResponse {
            id: String,
            url: String,
        }

        let success_url = request.success_url.as_deref().unwrap_or(success_url);
        let cancel_url = request.cancel_url.as_deref().unwrap_or(cancel_url);

        let mut form: Vec<(&str, String)> = vec![
            ("mode", "subscription".to_string()),
            ("line_items[0][price]", request.price_id.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", success_url.to_string()),
            ("cancel_url", cancel_url.to_string()),
            ("metadata[price_id]", request.price_id.clone()),
            ("allow_promotion_codes", "true".to_string()),
            ("billing_address_collection", "auto".to_string()),
            ("automatic_tax[enabled]", "true".to_string()),
        ];

        // These let the completion webhook attach the purchase to an account
        // without falling back to email matching.
        if let Some(account_id) = &request.account_id {
            form.push(("client_reference_id", account_id.clone()));
            form.push(("metadata[uid]", account_id.clone()));
        }
        if let Some(email) = &request.email {
            form.push(("customer_email", email.clone()));
        }

        let response = self
            .client
            .post(format!("{}/checkout/sessions", API_BASE))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        let session: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Stripe response: {}", e)))?;

        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }
}

// ============ Webhook wire types ============

/// Generic Stripe webhook event - object is parsed based on event_type.
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct StripeMetadata {
    pub uid: Option<String>,
    pub price_id: Option<String>,
}

// ============ checkout.session.completed ============

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub mode: Option<String>, // "payment" or "subscription"
    pub status: Option<String>,
    pub customer: Option<String>,
    pub customer_email: Option<String>,
    pub customer_details: Option<StripeCustomerDetails>,
    /// Internal account id set at session-creation time
    pub client_reference_id: Option<String>,
    pub subscription: Option<String>, // Present for subscription mode
    #[serde(default)]
    pub metadata: StripeMetadata,
}

impl StripeCheckoutSession {
    /// Email entered during checkout, preferring customer_details.
    pub fn email(&self) -> Option<String> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.clone())
            .or_else(|| self.customer_email.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeCustomerDetails {
    pub email: Option<String>,
}

// ============ customer.subscription.* ============

#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer: Option<String>,
    pub status: String, // "active", "past_due", "canceled", etc.
    pub current_period_end: Option<i64>,
    pub cancel_at_period_end: Option<bool>,
    #[serde(default)]
    pub metadata: StripeMetadata,
    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

impl StripeSubscription {
    /// Plan details from the first subscription item, if inlined.
    pub fn plan(&self) -> Option<PlanDetail> {
        self.items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .map(|price| price.to_plan())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StripeSubscriptionItems {
    #[serde(default)]
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionItem {
    pub price: Option<StripePrice>,
}

#[derive(Debug, Deserialize)]
pub struct StripePrice {
    pub id: String,
    pub product: Option<String>,
    pub unit_amount: Option<i64>,
    pub recurring: Option<StripeRecurring>,
}

#[derive(Debug, Deserialize)]
pub struct StripeRecurring {
    pub interval: String,
}

impl StripePrice {
    pub fn to_plan(&self) -> PlanDetail {
        PlanDetail {
            plan_id: self.id.clone(),
            product_id: self.product.clone(),
            billing_interval: self.recurring.as_ref().map(|r| r.interval.clone()),
            unit_amount: self.unit_amount,
        }
    }
}

// ============ invoice.payment_failed ============

#[derive(Debug, Deserialize)]
pub struct StripeInvoice {
    pub id: String,
    pub customer: Option<String>,
    pub subscription: Option<String>,
}

// ============ customers API ============

#[derive(Debug, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    pub email: Option<String>,
}
