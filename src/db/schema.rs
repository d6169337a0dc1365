use rusqlite::Connection;

/// Initialize the sale ledger schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    // WAL mode: concurrent webhook retries and download requests write from
    // separate pool connections; readers are never blocked by the writer.
    // synchronous=NORMAL: safe with WAL, faster than FULL
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;

        -- Sale ledger: exactly one row per payment reference.
        -- The UNIQUE constraint on reference is the idempotency boundary;
        -- inserts go through ON CONFLICT DO NOTHING, never check-then-insert.
        -- credential_hash is immutable after creation (no rotation).
        CREATE TABLE IF NOT EXISTS sales (
            id TEXT PRIMARY KEY,
            reference TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL,
            credential_hash TEXT NOT NULL,
            file_id TEXT NOT NULL,
            downloads_used INTEGER NOT NULL DEFAULT 0,
            download_limit INTEGER NOT NULL,
            amount_kobo INTEGER,
            domain TEXT NOT NULL CHECK (domain IN ('live', 'test')),
            created_at INTEGER NOT NULL,

            CHECK (downloads_used >= 0 AND downloads_used <= download_limit)
        );
        CREATE INDEX IF NOT EXISTS idx_sales_email ON sales(email, created_at DESC);
        "#,
    )
}
