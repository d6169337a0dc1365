//! The payment-to-delivery pipeline.
//!
//! Verify the transaction against Paystack, record the sale exactly once,
//! issue a single-use credential, mint a short-lived signed URL, and send
//! the credential email. Replays of an already-fulfilled reference return
//! the existing sale without re-running any side effect.

use crate::credential;
use crate::db::{queries, AppState};
use crate::email::{CredentialEmail, EmailOutcome};
use crate::error::{AppError, Result};
use crate::models::{NewSale, SaleInsert};
use crate::payments::{PaymentDomain, VerifiedPayment};

/// What a fulfillment request produced.
#[derive(Debug)]
pub enum Fulfillment {
    /// First fulfillment for this reference: a fresh credential was issued
    /// and (best-effort) emailed.
    Delivered {
        email: String,
        password: String,
        download_url: String,
        domain: PaymentDomain,
        email_outcome: EmailOutcome,
    },
    /// The reference was already fulfilled. The original credential stays
    /// valid; the buyer is directed back to their email.
    AlreadyFulfilled { email: String, domain: PaymentDomain },
}

/// Re-confirm a transaction reference against the provider's read API.
///
/// When the webhook signature pinned a domain, only that domain is asked.
/// Otherwise (a buyer pasting a reference by hand) every configured domain
/// is tried in order until one answers with a completed success.
pub async fn verify_reference(
    state: &AppState,
    reference: &str,
    domain_hint: Option<PaymentDomain>,
) -> Result<VerifiedPayment> {
    let domains = match domain_hint {
        Some(domain) => vec![domain],
        None => state.verifier.domains(),
    };

    if domains.is_empty() {
        return Err(AppError::Internal("No payment domains configured".into()));
    }

    let mut last_err: Option<AppError> = None;
    for domain in domains {
        match state.verifier.verify(domain, reference).await {
            Ok(Some(payment)) => return Ok(payment),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Verify error for {} in {} domain: {}", reference, domain, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        AppError::VerificationFailed(format!("Transaction {} not successful", reference))
    }))
}

/// Run the full pipeline for a verified-or-verifiable reference.
///
/// `email_override` takes precedence over the provider's embedded address
/// for deployments that trust the reference lookup more than the webhook.
/// Verification failures are terminal and create nothing; the caller may
/// safely resubmit the same reference later.
pub async fn fulfill(
    state: &AppState,
    reference: &str,
    email_override: Option<&str>,
    domain_hint: Option<PaymentDomain>,
) -> Result<Fulfillment> {
    let payment = verify_reference(state, reference, domain_hint).await?;

    let email = queries::normalize_email(email_override.unwrap_or(&payment.email));

    // Issue the credential before the insert; on a conflict the plaintext
    // is discarded without ever being stored or sent.
    let password = credential::generate_password();
    let credential_hash = credential::hash_password(&password)?;

    let conn = state.db.get()?;
    let insert = queries::record_sale_if_new(
        &conn,
        &NewSale {
            reference: payment.reference.clone(),
            email,
            credential_hash,
            file_id: state.settings.file_id.clone(),
            download_limit: state.settings.download_limit,
            amount_kobo: payment.amount_kobo,
            domain: payment.domain,
        },
    )?;
    drop(conn);

    let sale = match insert {
        SaleInsert::AlreadyExists(sale) => {
            tracing::info!(
                "Reference {} already fulfilled for {}; returning existing sale",
                sale.reference,
                sale.email
            );
            return Ok(Fulfillment::AlreadyFulfilled {
                email: sale.email,
                domain: sale.domain,
            });
        }
        SaleInsert::Created(sale) => sale,
    };

    tracing::info!(
        "Recorded sale {} for {} ({} domain)",
        sale.reference,
        sale.email,
        sale.domain
    );

    // The sale row is durable from here on. A signing failure is fatal for
    // this request (500); a provider retry lands on the AlreadyExists path.
    let download_url = state
        .store
        .signed_url(&sale.file_id, state.settings.signed_url_ttl)
        .await?;

    // Single best-effort attempt; failure is a soft warning, never a rollback.
    let email_outcome = match state
        .mailer
        .send_credential(&CredentialEmail {
            to: &sale.email,
            password: &password,
            download_page: &state.settings.download_page_url,
            download_limit: sale.download_limit,
        })
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Credential email to {} failed: {}", sale.email, e);
            EmailOutcome::Failed
        }
    };

    Ok(Fulfillment::Delivered {
        email: sale.email,
        password,
        download_url,
        domain: sale.domain,
        email_outcome,
    })
}
