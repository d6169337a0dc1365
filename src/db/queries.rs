use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{NewSale, Sale, SaleInsert};

use super::from_row::{query_one, SALE_COLS};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// Normalize an email for ledger writes and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Record a sale unless its reference was already fulfilled.
///
/// One constrained INSERT, not check-then-insert: concurrent webhook
/// retries for the same reference race on the UNIQUE constraint inside
/// SQLite, so at most one of them observes `Created`.
pub fn record_sale_if_new(conn: &Connection, input: &NewSale) -> Result<SaleInsert> {
    let id = gen_id();
    let created_at = now();
    let email = normalize_email(&input.email);

    let inserted = conn.execute(
        "INSERT INTO sales (id, reference, email, credential_hash, file_id,
                            downloads_used, download_limit, amount_kobo, domain, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8, ?9)
         ON CONFLICT(reference) DO NOTHING",
        params![
            &id,
            &input.reference,
            &email,
            &input.credential_hash,
            &input.file_id,
            input.download_limit,
            input.amount_kobo,
            input.domain.as_str(),
            created_at,
        ],
    )?;

    if inserted > 0 {
        return Ok(SaleInsert::Created(Sale {
            id,
            reference: input.reference.clone(),
            email,
            credential_hash: input.credential_hash.clone(),
            file_id: input.file_id.clone(),
            downloads_used: 0,
            download_limit: input.download_limit,
            amount_kobo: input.amount_kobo,
            domain: input.domain,
            created_at,
        }));
    }

    // Conflict: the reference was fulfilled earlier (or by a concurrent
    // delivery). Hand back the existing row so the caller can reply
    // idempotently without re-running side effects.
    let existing = get_sale_by_reference(conn, &input.reference)?.ok_or_else(|| {
        AppError::Internal(format!(
            "Sale insert conflicted but no row found for reference {}",
            input.reference
        ))
    })?;

    Ok(SaleInsert::AlreadyExists(existing))
}

pub fn get_sale_by_reference(conn: &Connection, reference: &str) -> Result<Option<Sale>> {
    query_one(
        conn,
        &format!("SELECT {} FROM sales WHERE reference = ?1", SALE_COLS),
        &[&reference],
    )
}

/// Most recent sale for a buyer email (normalized before lookup).
pub fn get_latest_sale_by_email(conn: &Connection, email: &str) -> Result<Option<Sale>> {
    let email = normalize_email(email);
    query_one(
        conn,
        &format!(
            "SELECT {} FROM sales WHERE email = ?1 ORDER BY created_at DESC LIMIT 1",
            SALE_COLS
        ),
        &[&email],
    )
}

/// Atomically consume one download if quota remains.
///
/// Quota check and increment are a single conditional UPDATE so two
/// concurrent requests against the same sale cannot both pass the limit.
/// Returns the downloads remaining after the increment, or `None` when the
/// quota was already exhausted (zero rows matched).
pub fn consume_download(conn: &Connection, sale_id: &str) -> Result<Option<i64>> {
    conn.query_row(
        "UPDATE sales SET downloads_used = downloads_used + 1
         WHERE id = ?1 AND downloads_used < download_limit
         RETURNING download_limit - downloads_used",
        params![sale_id],
        |row| row.get::<_, i64>(0),
    )
    .optional()
    .map_err(Into::into)
}

/// Ledger row count.
pub fn count_sales(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM sales", [], |row| row.get(0))
        .map_err(Into::into)
}
