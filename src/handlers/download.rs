use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::credential;
use crate::db::{queries, AppState};
use crate::error::{AppError, Result};

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub download_url: String,
    pub downloads_remaining: i64,
}

/// Authorize one download: credential gate, then quota gate, then a
/// short-lived signed URL. Rejections before the quota gate never touch
/// the counter.
///
/// The 404 (no sale) and 401 (bad password) bodies carry identical wording;
/// only the logs distinguish them, to avoid account enumeration.
pub async fn authorize_download(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> Result<Json<DownloadResponse>> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::BadRequest("email and password required".into()));
    }

    let conn = state.db.get()?;

    let sale = queries::get_latest_sale_by_email(&conn, &request.email)?
        .ok_or_else(|| AppError::NotFound(format!("no sale for email {}", request.email)))?;

    if !credential::verify_password(&request.password, &sale.credential_hash)? {
        tracing::info!("Credential mismatch for sale {}", sale.id);
        return Err(AppError::CredentialMismatch);
    }

    // Quota check and increment in one conditional UPDATE; zero rows means
    // the limit was reached (possibly by a concurrent request).
    let remaining = queries::consume_download(&conn, &sale.id)?.ok_or(AppError::QuotaExceeded)?;
    drop(conn);

    let download_url = state
        .store
        .signed_url(&sale.file_id, state.settings.signed_url_ttl)
        .await?;

    tracing::info!(
        "Authorized download for sale {} ({} remaining)",
        sale.id,
        remaining
    );

    Ok(Json(DownloadResponse {
        download_url,
        downloads_remaining: remaining,
    }))
}
