use axum::extract::State;
use axum::Json;

use crate::db::AppState;
use crate::error::Result;
use crate::payments::{CheckoutSession, CreateCheckoutSession};

/// POST /checkout/session
///
/// Creates a hosted checkout session with the account id embedded as
/// client_reference_id and metadata, so the completion webhook resolves
/// directly instead of falling back to customer-id or email heuristics.
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Json(request): Json<CreateCheckoutSession>,
) -> Result<Json<CheckoutSession>> {
    let success_url = request
        .success_url
        .as_deref()
        .unwrap_or(&state.checkout_success_url);
    let cancel_url = request
        .cancel_url
        .as_deref()
        .unwrap_or(&state.checkout_cancel_url);

    let session = state
        .billing
        .create_checkout_session(&request, success_url, cancel_url)
        .await?;

    tracing::info!(
        "Created checkout session {} for price {} (account: {:?})",
        session.id,
        request.price_id,
        request.account_id,
    );

    Ok(Json(session))
}
