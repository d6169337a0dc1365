//! Row mapping trait and helpers for the sale ledger queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::Sale;
use crate::payments::PaymentDomain;

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

pub const SALE_COLS: &str = "id, reference, email, credential_hash, file_id, downloads_used, download_limit, amount_kobo, domain, created_at";

impl FromRow for Sale {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        // Graceful error instead of a panic if the domain column is ever
        // corrupted; the CHECK constraint makes this unreachable in practice.
        let domain: PaymentDomain = row.get::<_, String>(8)?.parse().map_err(|_| {
            rusqlite::Error::InvalidColumnType(8, "domain".into(), rusqlite::types::Type::Text)
        })?;

        Ok(Sale {
            id: row.get(0)?,
            reference: row.get(1)?,
            email: row.get(2)?,
            credential_hash: row.get(3)?,
            file_id: row.get(4)?,
            downloads_used: row.get(5)?,
            download_limit: row.get(6)?,
            amount_kobo: row.get(7)?,
            domain,
            created_at: row.get(9)?,
        })
    }
}
