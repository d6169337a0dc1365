mod paystack;

pub use paystack::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which Paystack trust domain a secret (and a verified payment) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentDomain {
    Live,
    Test,
}

impl PaymentDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentDomain::Live => "live",
            PaymentDomain::Test => "test",
        }
    }
}

impl std::str::FromStr for PaymentDomain {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "live" => Ok(PaymentDomain::Live),
            "test" => Ok(PaymentDomain::Test),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for PaymentDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A webhook signing secret together with the domain it authenticates.
#[derive(Debug, Clone)]
pub struct WebhookSecret {
    pub domain: PaymentDomain,
    pub key: String,
}

/// A transaction the provider's read API confirmed as successful.
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    pub reference: String,
    pub email: String,
    pub amount_kobo: Option<i64>,
    pub domain: PaymentDomain,
}

/// Authoritative out-of-band transaction lookup. The webhook payload is only
/// a hint; nothing is granted without a successful answer from this trait.
///
/// `Ok(None)` means the provider answered but the transaction is not a
/// completed success in that domain. `Err` means the lookup itself failed
/// (network, malformed response) and is safe to retry later.
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    async fn verify(
        &self,
        domain: PaymentDomain,
        reference: &str,
    ) -> Result<Option<VerifiedPayment>>;

    /// Domains this verifier holds credentials for, in preference order.
    fn domains(&self) -> Vec<PaymentDomain>;
}
