//! Test utilities and fixtures for subsync integration tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use serde_json::json;

pub use subsync::db::{init_db, init_ledger_db, queries, AppState};
pub use subsync::models::*;
pub use subsync::payments::{
    BillingApi, CheckoutSession, CreateCheckoutSession, CustomerDetail, PlanDetail,
    SubscriptionDetail,
};
pub use subsync::payments::stripe::StripeEvent;

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Create an in-memory account store with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Create an in-memory event ledger with schema initialized
pub fn setup_test_ledger_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory ledger database");
    init_ledger_db(&conn).expect("Failed to initialize ledger schema");
    conn
}

/// Create a test account
pub fn create_test_account(conn: &Connection, email: &str) -> Account {
    let input = CreateAccount {
        email: Some(email.to_string()),
        billing_customer_id: None,
    };
    queries::create_account(conn, &input).expect("Failed to create test account")
}

/// Create a test account already linked to a billing customer
pub fn create_test_account_with_customer(
    conn: &Connection,
    email: &str,
    customer_id: &str,
) -> Account {
    let input = CreateAccount {
        email: Some(email.to_string()),
        billing_customer_id: Some(customer_id.to_string()),
    };
    queries::create_account(conn, &input).expect("Failed to create test account")
}

/// Billing API stub. Lookups answer from fixed data; checkout creation
/// returns a canned session.
pub struct StubBilling {
    pub customer_email: Option<String>,
    pub line_item_plan: Option<PlanDetail>,
    pub subscription_plan: Option<PlanDetail>,
    /// When true, every call fails as if the provider were down
    pub fail: bool,
}

impl Default for StubBilling {
    fn default() -> Self {
        Self {
            customer_email: None,
            line_item_plan: None,
            subscription_plan: None,
            fail: false,
        }
    }
}

impl StubBilling {
    fn check_up(&self) -> subsync::error::Result<()> {
        if self.fail {
            Err(subsync::error::AppError::Upstream(
                "stub provider unavailable".into(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BillingApi for StubBilling {
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> subsync::error::Result<SubscriptionDetail> {
        self.check_up()?;
        Ok(SubscriptionDetail {
            id: subscription_id.to_string(),
            customer: Some("cus_stub".to_string()),
            status: "active".to_string(),
            current_period_end: None,
            cancel_at_period_end: false,
            plan: self.subscription_plan.clone(),
        })
    }

    async fn get_customer(&self, customer_id: &str) -> subsync::error::Result<CustomerDetail> {
        self.check_up()?;
        Ok(CustomerDetail {
            id: customer_id.to_string(),
            email: self.customer_email.clone(),
        })
    }

    async fn expand_checkout_line_items(
        &self,
        _session_id: &str,
    ) -> subsync::error::Result<Option<PlanDetail>> {
        self.check_up()?;
        Ok(self.line_item_plan.clone())
    }

    async fn create_checkout_session(
        &self,
        _request: &CreateCheckoutSession,
        _success_url: &str,
        _cancel_url: &str,
    ) -> subsync::error::Result<CheckoutSession> {
        self.check_up()?;
        Ok(CheckoutSession {
            id: "cs_test_stub".to_string(),
            url: "https://checkout.stripe.test/cs_test_stub".to_string(),
        })
    }
}

/// Create an AppState for testing with in-memory databases and a stubbed
/// billing provider.
///
/// Pools are capped at one connection so every caller sees the same
/// in-memory database.
pub fn create_test_app_state(billing: StubBilling) -> AppState {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }

    let ledger_manager = SqliteConnectionManager::memory();
    let ledger_pool = Pool::builder().max_size(1).build(ledger_manager).unwrap();
    {
        let conn = ledger_pool.get().unwrap();
        init_ledger_db(&conn).unwrap();
    }

    AppState {
        db: pool,
        ledger: ledger_pool,
        billing: Arc::new(billing),
        webhook_secrets: vec![TEST_WEBHOOK_SECRET.to_string()],
        checkout_success_url: "http://localhost:3000/app".to_string(),
        checkout_cancel_url: "http://localhost:3000/billing".to_string(),
    }
}

/// Get the current timestamp
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

// ============ Event builders ============

pub fn make_event(id: &str, event_type: &str, object: serde_json::Value) -> StripeEvent {
    let raw = json!({
        "id": id,
        "type": event_type,
        "created": now(),
        "data": { "object": object },
    });
    serde_json::from_value(raw).expect("Failed to build test event")
}

pub fn checkout_completed_object(
    client_reference_id: Option<&str>,
    customer: Option<&str>,
    email: Option<&str>,
) -> serde_json::Value {
    json!({
        "id": "cs_test_a1b2c3",
        "mode": "subscription",
        "status": "complete",
        "customer": customer,
        "customer_details": { "email": email },
        "client_reference_id": client_reference_id,
        "subscription": "sub_test_123",
        "metadata": { "price_id": "price_test_pro" },
    })
}

pub fn subscription_object(customer: &str, status: &str) -> serde_json::Value {
    json!({
        "id": "sub_test_123",
        "customer": customer,
        "status": status,
        "current_period_end": now() + 30 * 86400,
        "cancel_at_period_end": false,
        "metadata": {},
        "items": {
            "data": [{
                "price": {
                    "id": "price_test_pro",
                    "product": "prod_test_pro",
                    "unit_amount": 990,
                    "recurring": { "interval": "month" },
                }
            }]
        },
    })
}

pub fn invoice_object(customer: &str) -> serde_json::Value {
    json!({
        "id": "in_test_123",
        "customer": customer,
        "subscription": "sub_test_123",
    })
}
