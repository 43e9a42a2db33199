mod from_row;
pub mod queries;
mod schema;

pub use from_row::{query_all, query_one, FromRow};
pub use schema::{init_db, init_ledger_db};

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::payments::BillingApi;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state injected into every handler and the dispatch loop.
/// Constructed once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    /// Account store pool
    pub db: DbPool,
    /// Event ledger pool (separate file to isolate growth)
    pub ledger: DbPool,
    /// Billing provider API, used by the reconciler to expand incomplete
    /// payloads and by the checkout endpoint
    pub billing: Arc<dyn BillingApi>,
    /// Trusted webhook signing secrets, tried in order
    pub webhook_secrets: Vec<String>,
    pub checkout_success_url: String,
    pub checkout_cancel_url: String,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
