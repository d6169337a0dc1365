use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::AppError;
use crate::fulfillment::{self, Fulfillment};
use crate::payments;

/// The fields we need from a Paystack `charge.success` event. The payload
/// is parsed only after the signature check accepted the raw bytes. The
/// embedded customer email is deliberately ignored; the verify API is the
/// authority on buyer identity.
#[derive(Debug, Deserialize)]
struct PaystackEvent {
    event: String,
    data: PaystackEventData,
}

#[derive(Debug, Deserialize)]
struct PaystackEventData {
    status: String,
    reference: String,
}

#[derive(Serialize)]
struct WebhookResponse {
    received: bool,
}

/// Axum handler for Paystack webhooks.
///
/// 200 once the event is accepted and processed - including events whose
/// status isn't a success, so the provider stops retrying them. 401 only
/// for signature rejection. Ledger failures return 500 and rely on the
/// provider's own retry.
pub async fn handle_paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get("x-paystack-signature")
        .and_then(|v| v.to_str().ok());

    let domain_hint = if state.webhook_bypass {
        // Explicit non-production escape hatch; never the default. With no
        // signature to pin a domain, verification tries all configured ones.
        tracing::warn!("PAYDROP_WEBHOOK_BYPASS enabled: accepting unsigned webhook");
        None
    } else {
        let domain = payments::authenticate_event(&state.webhook_secrets, &body, signature)
            .ok_or(AppError::SignatureInvalid)?;
        Some(domain)
    };

    let event: PaystackEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!("Unparseable webhook body: {}", e);
        AppError::BadRequest("Invalid JSON".into())
    })?;

    // Anything but a successful charge is acknowledged and dropped.
    if event.event != "charge.success" || event.data.status != "success" {
        tracing::debug!(
            "Ignoring webhook event {} (status: {})",
            event.event,
            event.data.status
        );
        return Ok((StatusCode::OK, Json(WebhookResponse { received: true })));
    }

    tracing::info!(
        "Webhook charge.success for reference {}{}",
        event.data.reference,
        domain_hint
            .map(|d| format!(" ({} domain)", d))
            .unwrap_or_default()
    );

    // The embedded email is only a hint; the verify call is authoritative.
    match fulfillment::fulfill(&state, &event.data.reference, None, domain_hint).await? {
        Fulfillment::Delivered { email, .. } => {
            tracing::info!("Webhook fulfillment complete for {}", email);
        }
        Fulfillment::AlreadyFulfilled { email, .. } => {
            tracing::info!("Webhook replay for already-fulfilled sale ({})", email);
        }
    }

    Ok((StatusCode::OK, Json(WebhookResponse { received: true })))
}
