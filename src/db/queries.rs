//! Queries for the account store and the event ledger.
//!
//! The two stores live in separate database files; callers are expected to
//! pass a connection from the matching pool (`AppState::db` for accounts,
//! `AppState::ledger` for events).

use rusqlite::{params, Connection};

use crate::db::from_row::{query_one, ACCOUNT_COLS, EVENT_COLS};
use crate::error::Result;
use crate::id::EntityType;
use crate::models::{Account, CreateAccount, EventRecord, RecordEvent, SubscriptionPatch};

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

// ============ Accounts ============

/// Create an account. Part of the signup flow, not the reconciler; the
/// reconciler never creates accounts, only mutates existing ones.
pub fn create_account(conn: &Connection, input: &CreateAccount) -> Result<Account> {
    let id = EntityType::Account.gen_id();
    let ts = now();

    conn.execute(
        "INSERT INTO accounts (id, email, billing_customer_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![id, input.email, input.billing_customer_id, ts],
    )?;

    get_account_by_id(conn, &id)?
        .ok_or_else(|| crate::error::AppError::Internal("Account vanished after insert".into()))
}

pub fn get_account_by_id(conn: &Connection, id: &str) -> Result<Option<Account>> {
    query_one(
        conn,
        &format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLS),
        &[&id],
    )
}

pub fn get_account_by_customer(conn: &Connection, customer_id: &str) -> Result<Option<Account>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM accounts WHERE billing_customer_id = ?1 ORDER BY id LIMIT 1",
            ACCOUNT_COLS
        ),
        &[&customer_id],
    )
}

/// Email lookup is a heuristic fallback: emails are not unique in practice,
/// so take the first match in a stable order.
pub fn get_account_by_email(conn: &Connection, email: &str) -> Result<Option<Account>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM accounts WHERE email = ?1 ORDER BY id LIMIT 1",
            ACCOUNT_COLS
        ),
        &[&email],
    )
}

/// Merge a partial subscription update into an account.
///
/// Each `None` field leaves the stored column untouched (COALESCE), so a
/// patch never clears data it doesn't mention and reapplying an identical
/// patch is a state-level no-op. `sub_updated_at` is always set to the
/// processing time.
///
/// Returns false if no account with that id exists.
pub fn apply_subscription_patch(
    conn: &Connection,
    account_id: &str,
    patch: &SubscriptionPatch,
) -> Result<bool> {
    let ts = now();
    let status = patch.status.map(|s| s.to_string());
    let cancel_at_period_end = patch.cancel_at_period_end.map(|b| b as i64);

    let affected = conn.execute(
        "UPDATE accounts SET
            billing_customer_id = COALESCE(?1, billing_customer_id),
            sub_status = COALESCE(?2, sub_status),
            sub_plan_id = COALESCE(?3, sub_plan_id),
            sub_product_id = COALESCE(?4, sub_product_id),
            sub_billing_interval = COALESCE(?5, sub_billing_interval),
            sub_unit_amount = COALESCE(?6, sub_unit_amount),
            sub_subscription_id = COALESCE(?7, sub_subscription_id),
            sub_session_id = COALESCE(?8, sub_session_id),
            sub_mode = COALESCE(?9, sub_mode),
            sub_current_period_end = COALESCE(?10, sub_current_period_end),
            sub_cancel_at_period_end = COALESCE(?11, sub_cancel_at_period_end),
            sub_canceled_at = COALESCE(?12, sub_canceled_at),
            sub_last_payment_failed_at = COALESCE(?13, sub_last_payment_failed_at),
            sub_updated_at = ?14,
            updated_at = ?14
         WHERE id = ?15",
        params![
            patch.billing_customer_id,
            status,
            patch.plan_id,
            patch.product_id,
            patch.billing_interval,
            patch.unit_amount,
            patch.subscription_id,
            patch.session_id,
            patch.mode,
            patch.current_period_end,
            cancel_at_period_end,
            patch.canceled_at,
            patch.last_payment_failed_at,
            ts,
            account_id,
        ],
    )?;
    Ok(affected > 0)
}

pub fn count_accounts(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
    Ok(count)
}

// ============ Event Ledger ============

/// Upsert an event row keyed by the provider's event id.
///
/// Safe to call multiple times for the same id (the payload is immutable
/// in practice); a redelivery refreshes received_at but must never clear
/// processed_at.
pub fn record_event(conn: &Connection, event: &RecordEvent) -> Result<()> {
    conn.execute(
        "INSERT INTO events (id, event_type, created_at, payload, received_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            event_type = excluded.event_type,
            payload = excluded.payload,
            received_at = excluded.received_at",
        params![event.id, event.event_type, event.created_at, event.payload, now()],
    )?;
    Ok(())
}

pub fn get_event(conn: &Connection, id: &str) -> Result<Option<EventRecord>> {
    query_one(
        conn,
        &format!("SELECT {} FROM events WHERE id = ?1", EVENT_COLS),
        &[&id],
    )
}

pub fn is_event_processed(conn: &Connection, id: &str) -> Result<bool> {
    use rusqlite::OptionalExtension;

    let processed: Option<Option<i64>> = conn
        .query_row(
            "SELECT processed_at FROM events WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(processed.flatten().is_some())
}

/// Set processed_at. Must be called only after the reconciler has fully
/// applied the event.
pub fn mark_event_processed(conn: &Connection, id: &str) -> Result<()> {
    conn.execute(
        "UPDATE events SET processed_at = ?1 WHERE id = ?2",
        params![now(), id],
    )?;
    Ok(())
}

/// Purge ledger rows beyond the retention period. Stripe redelivers for at
/// most ~3 days, so old rows only serve audit purposes.
/// Returns the number of deleted records.
pub fn purge_old_events(conn: &Connection, retention_days: i64) -> Result<usize> {
    let cutoff = now() - (retention_days * 86400);
    let deleted = conn.execute(
        "DELETE FROM events WHERE received_at < ?1",
        params![cutoff],
    )?;
    Ok(deleted)
}
