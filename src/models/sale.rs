use serde::{Deserialize, Serialize};

use crate::payments::PaymentDomain;

/// One fulfilled purchase. `reference` is the idempotency key; the
/// plaintext credential is never stored, only its Argon2id hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    /// Paystack transaction reference, globally unique
    pub reference: String,
    /// Buyer email at time of payment (normalized: trimmed, lowercase)
    pub email: String,
    #[serde(skip_serializing)]
    pub credential_hash: String,
    /// Object path of the deliverable in the storage bucket
    pub file_id: String,
    pub downloads_used: i64,
    pub download_limit: i64,
    /// Amount paid in kobo, as reported by the verify API
    pub amount_kobo: Option<i64>,
    /// Which payment domain (live/test) answered the verification
    pub domain: PaymentDomain,
    pub created_at: i64,
}

/// Input for the atomic insert-if-new ledger write.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub reference: String,
    pub email: String,
    pub credential_hash: String,
    pub file_id: String,
    pub download_limit: i64,
    pub amount_kobo: Option<i64>,
    pub domain: PaymentDomain,
}

/// Outcome of the single constrained ledger insert. `AlreadyExists` is the
/// idempotent replay path, not an error: the caller must not issue a new
/// credential or re-run side effects.
#[derive(Debug)]
pub enum SaleInsert {
    Created(Sale),
    AlreadyExists(Sale),
}
