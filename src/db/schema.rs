use rusqlite::Connection;

/// Initialize the account store schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Accounts (created by the signup flow; subscription columns are
        -- mutated only by the reconciler, via partial-field merges)
        CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            email TEXT,
            billing_customer_id TEXT,
            sub_status TEXT NOT NULL DEFAULT 'none',
            sub_plan_id TEXT,
            sub_product_id TEXT,
            sub_billing_interval TEXT,
            sub_unit_amount INTEGER,
            sub_subscription_id TEXT,
            sub_session_id TEXT,
            sub_mode TEXT,
            sub_current_period_end INTEGER,
            sub_cancel_at_period_end INTEGER NOT NULL DEFAULT 0,
            sub_canceled_at INTEGER,
            sub_last_payment_failed_at INTEGER,
            sub_updated_at INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_accounts_customer ON accounts(billing_customer_id);
        CREATE INDEX IF NOT EXISTS idx_accounts_email ON accounts(email);
        CREATE INDEX IF NOT EXISTS idx_accounts_subscription ON accounts(sub_subscription_id);
        "#,
    )?;
    Ok(())
}

/// Initialize the event ledger schema (separate DB file to isolate growth).
/// Optimized for an append-mostly workload with WAL mode.
pub fn init_ledger_db(conn: &Connection) -> rusqlite::Result<()> {
    // WAL mode: writes are sequential appends, much faster for this workload
    // synchronous=NORMAL: safe with WAL, faster than FULL
    // journal_size_limit: prevent WAL from growing indefinitely
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 1000;
        PRAGMA journal_size_limit = 67108864;

        -- Every event ever received, keyed by the provider's event id.
        -- processed_at set exactly once, after reconciliation succeeds.
        CREATE TABLE IF NOT EXISTS events (
            id TEXT PRIMARY KEY,
            event_type TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            payload TEXT NOT NULL,
            received_at INTEGER NOT NULL,
            processed_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_events_received ON events(received_at);
        "#,
    )?;
    Ok(())
}
