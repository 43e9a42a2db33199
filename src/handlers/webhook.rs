//! Webhook ingress. Verification happens here, against the raw body bytes,
//! before any JSON parsing; everything after verification is delegated to
//! the dispatch loop.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::payments::stripe::StripeEvent;
use crate::payments::verify_webhook_signature;
use crate::reconcile;

/// POST /webhook/stripe
///
/// Status codes are the contract with the provider's redelivery machinery:
/// 2xx acknowledges (terminal outcomes, duplicates and unresolved events
/// included), 4xx rejects (verification or parse failure - redelivering the
/// same bytes cannot succeed), 5xx asks for a redelivery (transient store
/// failure).
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let signature = headers
        .get("stripe-signature")
        .ok_or_else(|| AppError::BadRequest("Missing stripe-signature header".into()))?
        .to_str()
        .map_err(|e| {
            tracing::debug!("Invalid UTF-8 in stripe-signature header: {}", e);
            AppError::BadRequest("Invalid signature header".into())
        })?;

    if !verify_webhook_signature(&body, signature, &state.webhook_secrets)? {
        tracing::warn!("Rejected webhook with invalid signature");
        return Err(AppError::SignatureInvalid);
    }

    let event: StripeEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!("Failed to parse webhook body: {}", e);
        AppError::BadRequest("Invalid JSON".into())
    })?;

    tracing::info!("Received event {} ({})", event.id, event.event_type);

    let outcome = reconcile::dispatch(&state, &event).await?;

    Ok((StatusCode::OK, outcome.message()))
}
