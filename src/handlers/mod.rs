mod download;
mod fulfill;
mod webhook;

pub use download::*;
pub use fulfill::*;
pub use webhook::*;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::db::AppState;
use crate::rate_limit::{self, RateLimitConfig};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the public router with per-IP rate limiting tiers.
///
/// The webhook route is deliberately unthrottled: Paystack retries failed
/// deliveries and dropping them behind a limiter would lose payments.
pub fn router(rate_limit: RateLimitConfig) -> Router<AppState> {
    Router::new()
        .route(
            "/health",
            get(health).layer(rate_limit::relaxed_layer(rate_limit.relaxed_rpm)),
        )
        // /fulfill calls the Paystack verify API - strict tier
        .route(
            "/fulfill",
            post(fulfill_reference).layer(rate_limit::strict_layer(rate_limit.strict_rpm)),
        )
        // /download does a slow credential hash check - standard tier
        .route(
            "/download",
            post(authorize_download).layer(rate_limit::standard_layer(rate_limit.standard_rpm)),
        )
        .route("/webhook/paystack", post(handle_paystack_webhook))
}
