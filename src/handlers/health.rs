use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::db::{queries, AppState};
use crate::error::Result;

/// GET /healthz
///
/// Round-trips both stores so a wedged pool or corrupted file shows up as a
/// 500 instead of a green check.
pub async fn healthz(State(state): State<AppState>) -> Result<Json<Value>> {
    let accounts = {
        let conn = state.db.get()?;
        queries::count_accounts(&conn)?
    };

    {
        let conn = state.ledger.get()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
    }

    Ok(Json(json!({
        "status": "ok",
        "accounts": accounts,
    })))
}

/// GET /diag/env
///
/// Reports which configuration variables are set. Presence only - values
/// never leave the process.
pub async fn diag_env() -> Json<Value> {
    let vars = [
        "DATABASE_PATH",
        "LEDGER_DATABASE_PATH",
        "STRIPE_SECRET_KEY",
        "STRIPE_WEBHOOK_SECRETS",
        "CHECKOUT_SUCCESS_URL",
        "CHECKOUT_CANCEL_URL",
        "EVENT_RETENTION_DAYS",
        "SUBSYNC_ENV",
    ];

    let report: Value = vars
        .iter()
        .map(|name| {
            let set = std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false);
            ((*name).to_string(), Value::Bool(set))
        })
        .collect::<serde_json::Map<_, _>>()
        .into();

    Json(json!({ "env": report }))
}
