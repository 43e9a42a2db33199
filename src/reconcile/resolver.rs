//! Account resolution: map an event's identifying fields to an internal
//! account via an ordered cascade of lookup strategies.

use rusqlite::Connection;

use crate::db::queries;
use crate::error::Result;
use crate::id::is_valid_prefixed_id;
use crate::models::Account;

/// Identifying fields extracted from an event, strongest first.
#[derive(Debug, Default, Clone)]
pub struct ResolutionHints {
    /// Internal account id (explicit linkage set at session-creation time)
    pub account_id: Option<String>,
    /// Provider customer id ("cus_...")
    pub billing_customer_id: Option<String>,
    /// Heuristic fallback - emails are not unique
    pub email: Option<String>,
}

impl ResolutionHints {
    pub fn is_empty(&self) -> bool {
        self.account_id.is_none() && self.billing_customer_id.is_none() && self.email.is_none()
    }
}

/// Resolve hints to an account. First match wins:
/// 1. account id (primary key)
/// 2. billing customer id
/// 3. email (first match in stable account-id order)
///
/// `Ok(None)` is not an error - the caller logs and skips the event.
pub fn resolve(conn: &Connection, hints: &ResolutionHints) -> Result<Option<Account>> {
    if let Some(account_id) = &hints.account_id {
        // client_reference_id is attacker-influenced free text; only query
        // for values shaped like our own ids.
        if is_valid_prefixed_id(account_id) {
            if let Some(account) = queries::get_account_by_id(conn, account_id)? {
                tracing::debug!("Resolved account {} by id", account.id);
                return Ok(Some(account));
            }
        } else {
            tracing::debug!("Ignoring malformed account id hint: {}", account_id);
        }
    }

    if let Some(customer_id) = &hints.billing_customer_id {
        if let Some(account) = queries::get_account_by_customer(conn, customer_id)? {
            tracing::debug!("Resolved account {} by billing customer id", account.id);
            return Ok(Some(account));
        }
    }

    if let Some(email) = &hints.email {
        if let Some(account) = queries::get_account_by_email(conn, email)? {
            tracing::debug!("Resolved account {} by email", account.id);
            return Ok(Some(account));
        }
    }

    Ok(None)
}
