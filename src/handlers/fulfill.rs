use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::email::EmailOutcome;
use crate::error::{AppError, Result};
use crate::fulfillment::{self, Fulfillment};
use crate::payments::PaymentDomain;

#[derive(Debug, Deserialize)]
pub struct FulfillRequest {
    reference: String,
    /// Optional override for deployments that trust the reference lookup
    /// more than the provider's embedded email
    email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FulfillResponse {
    ok: bool,
    email: String,
    domain: PaymentDomain,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email_status: Option<EmailOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    already_fulfilled: Option<bool>,
    message: &'static str,
}

/// Manual verify-and-fulfill: the redirect-based flow where the buyer (or
/// an operator) submits a transaction reference directly.
///
/// Replay of an already-fulfilled reference is a 200, not an error - the
/// buyer is pointed back at their credential email.
pub async fn fulfill_reference(
    State(state): State<AppState>,
    Json(request): Json<FulfillRequest>,
) -> Result<Json<FulfillResponse>> {
    let reference = request.reference.trim();
    if reference.is_empty() {
        return Err(AppError::BadRequest("reference is required".into()));
    }
    // References are provider-generated tokens; reject anything that could
    // change the meaning of the verify URL path.
    if !reference
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'='))
    {
        return Err(AppError::BadRequest("Invalid reference".into()));
    }

    let outcome =
        fulfillment::fulfill(&state, reference, request.email.as_deref(), None).await?;

    let response = match outcome {
        Fulfillment::Delivered {
            email,
            password,
            download_url,
            domain,
            email_outcome,
        } => FulfillResponse {
            ok: true,
            email,
            domain,
            password: Some(password),
            download_url: Some(download_url),
            email_status: Some(email_outcome),
            already_fulfilled: None,
            message: match email_outcome {
                EmailOutcome::Sent => "Password generated and emailed",
                EmailOutcome::Failed => {
                    "Password generated. Email delivery failed; save it from this page"
                }
                EmailOutcome::Disabled => "Password generated; save it from this page",
            },
        },
        Fulfillment::AlreadyFulfilled { email, domain } => FulfillResponse {
            ok: true,
            email,
            domain,
            password: None,
            download_url: None,
            email_status: None,
            already_fulfilled: Some(true),
            message: "This transaction was already fulfilled. Check your email for your password",
        },
    };

    Ok(Json(response))
}
