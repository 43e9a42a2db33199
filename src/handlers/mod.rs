pub mod checkout;
pub mod health;
pub mod webhook;

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::db::AppState;

pub fn router() -> Router<AppState> {
    // The checkout endpoint is called from browser frontends on arbitrary
    // domains, so it mirrors the request origin. Webhooks are server-to-server
    // and need no CORS.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/webhook/stripe", post(webhook::handle_stripe_webhook))
        .route(
            "/checkout/session",
            post(checkout::create_checkout_session).layer(cors),
        )
        .route("/healthz", get(health::healthz))
        .route("/diag/env", get(health::diag_env))
}
