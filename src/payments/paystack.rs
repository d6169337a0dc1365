use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha512;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

use super::{PaymentDomain, PaymentVerifier, VerifiedPayment, WebhookSecret};

type HmacSha512 = Hmac<Sha512>;

const PAYSTACK_API_BASE: &str = "https://api.paystack.co";

/// Check an inbound webhook's `x-paystack-signature` against every configured
/// secret and report which domain signed it, or `None` for a forgery.
///
/// Paystack signs the verbatim request body with HMAC-SHA512 and sends the
/// lowercase hex digest. The check must run over the raw wire bytes;
/// re-serializing the parsed JSON changes byte order and breaks matching.
/// Pure check, no side effects, no default-accept fallback.
pub fn authenticate_event(
    secrets: &[WebhookSecret],
    body: &[u8],
    signature: Option<&str>,
) -> Option<PaymentDomain> {
    let signature = signature?;

    for secret in secrets {
        let mut mac = match HmacSha512::new_from_slice(secret.key.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => continue,
        };
        mac.update(body);
        let expected = hex::encode(mac.finalize().into_bytes());

        // Constant-time comparison so response timing leaks nothing about
        // how much of a forged signature matched.
        let expected_bytes = expected.as_bytes();
        let provided_bytes = signature.as_bytes();
        if expected_bytes.len() == provided_bytes.len()
            && expected_bytes.ct_eq(provided_bytes).into()
        {
            return Some(secret.domain);
        }
    }

    None
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: bool,
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    reference: String,
    amount: Option<i64>,
    customer: Option<VerifyCustomer>,
}

#[derive(Debug, Deserialize)]
struct VerifyCustomer {
    email: Option<String>,
}

/// Server-to-server Paystack client for the transaction verify API.
///
/// Holds one secret key per configured domain so a single deployment can
/// serve both live and test transactions.
#[derive(Debug, Clone)]
pub struct PaystackClient {
    client: Client,
    live_secret: Option<String>,
    test_secret: Option<String>,
}

impl PaystackClient {
    pub fn new(live_secret: Option<String>, test_secret: Option<String>) -> Self {
        Self {
            client: Client::new(),
            live_secret,
            test_secret,
        }
    }

    fn secret_for(&self, domain: PaymentDomain) -> Option<&str> {
        match domain {
            PaymentDomain::Live => self.live_secret.as_deref(),
            PaymentDomain::Test => self.test_secret.as_deref(),
        }
    }
}

#[async_trait]
impl PaymentVerifier for PaystackClient {
    async fn verify(
        &self,
        domain: PaymentDomain,
        reference: &str,
    ) -> Result<Option<VerifiedPayment>> {
        let secret = self
            .secret_for(domain)
            .ok_or_else(|| AppError::Internal(format!("No Paystack key for {} domain", domain)))?;

        let url = format!("{}/transaction/verify/{}", PAYSTACK_API_BASE, reference);
        let response = self
            .client
            .get(&url)
            .bearer_auth(secret)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::VerificationFailed(format!("Paystack unreachable: {}", e)))?;

        // A non-2xx answer (unknown reference in this domain, bad key) is a
        // definitive "not successful here" - the caller may try another domain.
        if !response.status().is_success() {
            tracing::debug!(
                "Paystack verify non-success for {} in {} domain: {}",
                reference,
                domain,
                response.status()
            );
            return Ok(None);
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| AppError::VerificationFailed(format!("Malformed Paystack body: {}", e)))?;

        let Some(data) = body.data else {
            return Ok(None);
        };

        if !body.status || data.status != "success" {
            tracing::debug!(
                "Transaction {} not successful in {} domain (status: {})",
                reference,
                domain,
                data.status
            );
            return Ok(None);
        }

        let email = data
            .customer
            .and_then(|c| c.email)
            .ok_or_else(|| {
                AppError::VerificationFailed("No customer email on transaction".into())
            })?;

        Ok(Some(VerifiedPayment {
            reference: data.reference,
            email,
            amount_kobo: data.amount,
            domain,
        }))
    }

    fn domains(&self) -> Vec<PaymentDomain> {
        let mut domains = Vec::new();
        if self.live_secret.is_some() {
            domains.push(PaymentDomain::Live);
        }
        if self.test_secret.is_some() {
            domains.push(PaymentDomain::Test);
        }
        domains
    }
}
