//! Test utilities and fixtures for Paydrop integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::routing::post;
use axum::Router;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tempfile::NamedTempFile;

pub use paydrop::credential;
pub use paydrop::db::{create_pool, init_db, queries, AppState, DbPool, FulfillmentSettings};
pub use paydrop::email::{CredentialEmail, EmailOutcome, Mailer};
pub use paydrop::error::{AppError, Result};
pub use paydrop::fulfillment;
pub use paydrop::handlers::{authorize_download, fulfill_reference, handle_paystack_webhook};
pub use paydrop::models::*;
pub use paydrop::payments::{
    authenticate_event, PaymentDomain, PaymentVerifier, VerifiedPayment, WebhookSecret,
};
pub use paydrop::storage::ObjectStore;

pub const LIVE_SECRET: &str = "sk_live_fixture";
pub const TEST_SECRET: &str = "sk_test_fixture";

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Pooled on-disk database for tests that need concurrent connections.
/// The temp file handle must outlive the pool.
pub fn setup_test_pool() -> (DbPool, NamedTempFile) {
    let db_file = NamedTempFile::new().expect("temp db file");
    let pool = create_pool(db_file.path().to_str().unwrap()).expect("pool");
    {
        let conn = pool.get().expect("conn");
        init_db(&conn).expect("schema");
    }
    (pool, db_file)
}

/// Insert a sale directly through the ledger, returning it and the
/// plaintext password.
pub fn create_test_sale(conn: &Connection, reference: &str, email: &str) -> (Sale, String) {
    let password = credential::generate_password();
    let hash = credential::hash_password(&password).expect("hash");
    let insert = queries::record_sale_if_new(
        conn,
        &NewSale {
            reference: reference.to_string(),
            email: email.to_string(),
            credential_hash: hash,
            file_id: "guide.pdf".to_string(),
            download_limit: 3,
            amount_kobo: Some(500_000),
            domain: PaymentDomain::Test,
        },
    )
    .expect("insert");
    match insert {
        SaleInsert::Created(sale) => (sale, password),
        SaleInsert::AlreadyExists(_) => panic!("fixture reference already used"),
    }
}

/// Payment verifier fake backed by a reference -> payment map.
#[derive(Default)]
pub struct FakeVerifier {
    transactions: HashMap<String, VerifiedPayment>,
    domains: Vec<PaymentDomain>,
}

impl FakeVerifier {
    pub fn new() -> Self {
        Self {
            transactions: HashMap::new(),
            domains: vec![PaymentDomain::Live, PaymentDomain::Test],
        }
    }

    pub fn with_success(
        mut self,
        reference: &str,
        email: &str,
        domain: PaymentDomain,
    ) -> Self {
        self.transactions.insert(
            reference.to_string(),
            VerifiedPayment {
                reference: reference.to_string(),
                email: email.to_string(),
                amount_kobo: Some(500_000),
                domain,
            },
        );
        self
    }
}

#[async_trait]
impl PaymentVerifier for FakeVerifier {
    async fn verify(
        &self,
        domain: PaymentDomain,
        reference: &str,
    ) -> Result<Option<VerifiedPayment>> {
        Ok(self
            .transactions
            .get(reference)
            .filter(|p| p.domain == domain)
            .cloned())
    }

    fn domains(&self) -> Vec<PaymentDomain> {
        self.domains.clone()
    }
}

/// Object store fake that records the requested TTL and returns a
/// deterministic URL.
#[derive(Default)]
pub struct FakeStore {
    pub last_ttl: Mutex<Option<Duration>>,
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn signed_url(&self, file_id: &str, ttl: Duration) -> Result<String> {
        *self.last_ttl.lock().unwrap() = Some(ttl);
        Ok(format!(
            "https://storage.test/sign/{}?expires_in={}",
            file_id,
            ttl.as_secs()
        ))
    }
}

#[derive(Debug, Clone)]
pub struct SentCredential {
    pub to: String,
    pub password: String,
}

/// Mailer fake that records every send; optionally fails to exercise the
/// soft-warning path.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<SentCredential>>>,
    pub fail: bool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_credential(&self, email: &CredentialEmail<'_>) -> Result<EmailOutcome> {
        if self.fail {
            return Err(AppError::Internal("mailer down".into()));
        }
        self.sent.lock().unwrap().push(SentCredential {
            to: email.to.to_string(),
            password: email.password.to_string(),
        });
        Ok(EmailOutcome::Sent)
    }
}

/// A full AppState wired to fakes plus handles for assertions.
pub struct TestHarness {
    pub state: AppState,
    pub sent_emails: Arc<Mutex<Vec<SentCredential>>>,
    pub store: Arc<FakeStore>,
    // Keeps the on-disk database alive for the pool's lifetime
    _db_file: NamedTempFile,
}

impl TestHarness {
    pub fn conn(&self) -> r2d2::PooledConnection<SqliteConnectionManager> {
        self.state.db.get().expect("pool connection")
    }

    pub fn sale_count(&self) -> i64 {
        queries::count_sales(&self.conn()).expect("count")
    }
}

pub fn test_harness(verifier: FakeVerifier) -> TestHarness {
    test_harness_with(verifier, RecordingMailer::default(), false)
}

pub fn test_harness_with(
    verifier: FakeVerifier,
    mailer: RecordingMailer,
    webhook_bypass: bool,
) -> TestHarness {
    let (pool, db_file) = setup_test_pool();
    let sent_emails = mailer.sent.clone();
    let store = Arc::new(FakeStore::default());

    let state = AppState {
        db: pool,
        settings: Arc::new(FulfillmentSettings {
            file_id: "guide.pdf".to_string(),
            download_limit: 3,
            signed_url_ttl: Duration::from_secs(300),
            download_page_url: "https://shop.test/download.html".to_string(),
        }),
        verifier: Arc::new(verifier),
        store: store.clone(),
        mailer: Arc::new(mailer),
        webhook_secrets: Arc::new(vec![
            WebhookSecret {
                domain: PaymentDomain::Live,
                key: LIVE_SECRET.to_string(),
            },
            WebhookSecret {
                domain: PaymentDomain::Test,
                key: TEST_SECRET.to_string(),
            },
        ]),
        webhook_bypass,
    };

    TestHarness {
        state,
        sent_emails,
        store,
        _db_file: db_file,
    }
}

/// Router with the public handlers and no rate limiting layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/webhook/paystack", post(handle_paystack_webhook))
        .route("/fulfill", post(fulfill_reference))
        .route("/download", post(authorize_download))
        .with_state(state)
}

/// Compute a Paystack-style webhook signature: HMAC-SHA512 hex over the body.
pub fn paystack_signature(secret: &str, body: &[u8]) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha512;

    let mut mac =
        Hmac::<Sha512>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
