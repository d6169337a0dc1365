//! Object storage backend for the deliverable file.
//!
//! The only operation the pipeline needs is a short-lived signed retrieval
//! URL. Expiry is enforced by the storage backend itself, independent of
//! this system's state, so sharing the URL (unlike the credential) has
//! limited value.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Capability interface over the storage backend.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create a time-boxed signed URL for the given object path.
    async fn signed_url(&self, file_id: &str, ttl: Duration) -> Result<String>;
}

#[derive(Serialize)]
struct SignRequest {
    #[serde(rename = "expiresIn")]
    expires_in: u64,
}

#[derive(Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

/// Supabase Storage client backed by the service-role key.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: &str, bucket: &str, service_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            service_key: service_key.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for SupabaseStore {
    async fn signed_url(&self, file_id: &str, ttl: Duration) -> Result<String> {
        let url = format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.base_url, self.bucket, file_id
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .json(&SignRequest {
                expires_in: ttl.as_secs(),
            })
            .send()
            .await
            .map_err(|e| AppError::SignedUrlFailed(format!("Storage unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::SignedUrlFailed(format!(
                "Storage sign error {}: {}",
                status, body
            )));
        }

        let signed: SignResponse = response
            .json()
            .await
            .map_err(|e| AppError::SignedUrlFailed(format!("Malformed sign response: {}", e)))?;

        // The API returns a path relative to /storage/v1.
        Ok(format!(
            "{}/storage/v1{}",
            self.base_url,
            signed.signed_url
        ))
    }
}
