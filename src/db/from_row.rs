//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Trait for constructing a type from a database row.
///
/// Implementing this trait allows using the `query_one` and `query_all`
/// helper functions, reducing repetitive row mapping closures.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const ACCOUNT_COLS: &str = "id, email, billing_customer_id, sub_status, sub_plan_id, \
    sub_product_id, sub_billing_interval, sub_unit_amount, sub_subscription_id, sub_session_id, \
    sub_mode, sub_current_period_end, sub_cancel_at_period_end, sub_canceled_at, \
    sub_last_payment_failed_at, sub_updated_at, created_at, updated_at";

pub const EVENT_COLS: &str = "id, event_type, created_at, payload, received_at, processed_at";

// ============ FromRow Implementations ============

impl FromRow for Account {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        // SubscriptionStatus::from_str never fails (unknown strings map to
        // Unknown), so database corruption can't panic a query.
        let status = row
            .get::<_, String>(3)?
            .parse()
            .unwrap_or(SubscriptionStatus::Unknown);
        Ok(Account {
            id: row.get(0)?,
            email: row.get(1)?,
            billing_customer_id: row.get(2)?,
            subscription: SubscriptionState {
                status,
                plan_id: row.get(4)?,
                product_id: row.get(5)?,
                billing_interval: row.get(6)?,
                unit_amount: row.get(7)?,
                subscription_id: row.get(8)?,
                session_id: row.get(9)?,
                mode: row.get(10)?,
                current_period_end: row.get(11)?,
                cancel_at_period_end: row.get::<_, i32>(12)? != 0,
                canceled_at: row.get(13)?,
                last_payment_failed_at: row.get(14)?,
                updated_at: row.get(15)?,
            },
            created_at: row.get(16)?,
            updated_at: row.get(17)?,
        })
    }
}

impl FromRow for EventRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(EventRecord {
            id: row.get(0)?,
            event_type: row.get(1)?,
            created_at: row.get(2)?,
            payload: row.get(3)?,
            received_at: row.get(4)?,
            processed_at: row.get(5)?,
        })
    }
}
