//! Credential delivery by email.
//!
//! Two modes:
//! 1. Send via the Resend API (default when an API key is configured)
//! 2. Disabled (no key configured; log only)
//!
//! One synchronous attempt per fulfillment, no retry queue. A send failure
//! is reported as a soft warning and never rolls back the ledger write -
//! the buyer already saw their credential on-page.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::{AppError, Result};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Outcome of the single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailOutcome {
    /// Email was accepted by the provider
    Sent,
    /// Provider call failed; fulfillment still succeeds
    Failed,
    /// No API key configured for this deployment
    Disabled,
}

/// What goes into the credential email.
#[derive(Debug)]
pub struct CredentialEmail<'a> {
    pub to: &'a str,
    pub password: &'a str,
    /// Page where the buyer enters email + password
    pub download_page: &'a str,
    pub download_limit: i64,
}

/// Capability interface over the transactional email provider.
///
/// `Err` means the provider call itself failed; callers downgrade that to
/// [`EmailOutcome::Failed`] rather than failing fulfillment.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_credential(&self, email: &CredentialEmail<'_>) -> Result<EmailOutcome>;
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: String,
    text: String,
}

/// Resend-backed mailer.
#[derive(Debug, Clone)]
pub struct ResendMailer {
    client: Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: &str, from: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }
}

fn render_html(email: &CredentialEmail<'_>) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2>Thank you for your purchase!</h2>
  <p>Your guide is ready for download.</p>
  <div style="background-color: #f9f9f9; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <p><strong>Your unique password:</strong> <code style="background-color: #e9e9e9; padding: 4px 8px; border-radius: 4px;">{password}</code></p>
    <p><strong>Download page:</strong> <a href="{page}">{page}</a></p>
  </div>
  <p><small>Note: You have up to {limit} downloads. Each download link expires after a few minutes for security.</small></p>
</div>"#,
        password = email.password,
        page = email.download_page,
        limit = email.download_limit,
    )
}

fn render_text(email: &CredentialEmail<'_>) -> String {
    format!(
        "Thank you for your purchase!\n\nYour password: {}\nDownload page: {}\n\nNote: You have up to {} downloads.",
        email.password, email.download_page, email.download_limit,
    )
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send_credential(&self, email: &CredentialEmail<'_>) -> Result<EmailOutcome> {
        let request = ResendRequest {
            from: &self.from,
            to: [email.to],
            subject: "Your download is ready",
            html: render_html(email),
            text: render_text(email),
        };

        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Resend unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Resend error {}: {}",
                status, body
            )));
        }

        Ok(EmailOutcome::Sent)
    }
}

/// Mailer used when no API key is configured: logs and sends nothing.
#[derive(Debug, Clone, Copy)]
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send_credential(&self, email: &CredentialEmail<'_>) -> Result<EmailOutcome> {
        tracing::info!("Email disabled; skipping credential email to {}", email.to);
        Ok(EmailOutcome::Disabled)
    }
}
