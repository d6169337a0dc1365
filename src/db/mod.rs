mod from_row;
mod schema;
pub mod queries;

pub use from_row::{query_one, FromRow, SALE_COLS};
pub use schema::init_db;

use std::sync::Arc;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::email::Mailer;
use crate::payments::{PaymentVerifier, WebhookSecret};
use crate::storage::ObjectStore;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Fulfillment knobs that never change after startup.
#[derive(Debug, Clone)]
pub struct FulfillmentSettings {
    /// Object path of the single deliverable in the storage bucket
    pub file_id: String,
    pub download_limit: i64,
    pub signed_url_ttl: Duration,
    /// Page where the buyer enters email + password
    pub download_page_url: String,
}

/// Application state shared across request handlers.
///
/// External collaborators (payment provider, object storage, email) are held
/// as trait objects so tests can swap in fakes. The only cross-request
/// coordination lives in the database: the unique `reference` constraint and
/// the conditional quota update.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub settings: Arc<FulfillmentSettings>,
    pub verifier: Arc<dyn PaymentVerifier>,
    pub store: Arc<dyn ObjectStore>,
    pub mailer: Arc<dyn Mailer>,
    pub webhook_secrets: Arc<Vec<WebhookSecret>>,
    /// Accept unsigned webhook events. Test deployments only, default off.
    pub webhook_bypass: bool,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    // busy_timeout is per-connection: concurrent writers (duplicate webhook
    // deliveries, simultaneous downloads) wait for the lock instead of
    // surfacing SQLITE_BUSY.
    let manager = SqliteConnectionManager::file(database_path)
        .with_init(|conn| conn.execute_batch("PRAGMA busy_timeout = 5000;"));
    Pool::builder().max_size(10).build(manager)
}
