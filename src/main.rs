use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paydrop::config::Config;
use paydrop::db::{create_pool, init_db, AppState, FulfillmentSettings};
use paydrop::email::{DisabledMailer, Mailer, ResendMailer};
use paydrop::handlers;
use paydrop::payments::PaystackClient;
use paydrop::storage::SupabaseStore;

#[derive(Parser, Debug)]
#[command(name = "paydrop")]
#[command(about = "Payment-to-download fulfillment server for a single digital product")]
struct Cli {
    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paydrop=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.paystack_live_secret.is_none() && config.paystack_test_secret.is_none() {
        tracing::error!("No Paystack secret configured (PAYSTACK_SECRET_KEY / PAYSTACK_TEST_SECRET_KEY)");
        std::process::exit(1);
    }
    if config.webhook_bypass {
        tracing::warn!("PAYDROP_WEBHOOK_BYPASS is enabled - webhook signatures are NOT checked");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get database connection");
        init_db(&conn).expect("Failed to initialize database schema");
    }

    let verifier = Arc::new(PaystackClient::new(
        config.paystack_live_secret.clone(),
        config.paystack_test_secret.clone(),
    ));
    let store = Arc::new(SupabaseStore::new(
        &config.supabase_url,
        &config.storage_bucket,
        &config.supabase_service_key,
    ));
    let mailer: Arc<dyn Mailer> = match &config.resend_api_key {
        Some(key) => Arc::new(ResendMailer::new(key, &config.email_from)),
        None => {
            tracing::warn!("RESEND_API_KEY not set; credential emails are disabled");
            Arc::new(DisabledMailer)
        }
    };

    let state = AppState {
        db: db_pool,
        settings: Arc::new(FulfillmentSettings {
            file_id: config.file_id.clone(),
            download_limit: config.download_limit,
            signed_url_ttl: Duration::from_secs(config.signed_url_ttl_secs),
            download_page_url: config.download_page_url.clone(),
        }),
        verifier,
        store,
        mailer,
        webhook_secrets: Arc::new(config.webhook_secrets()),
        webhook_bypass: config.webhook_bypass,
    };

    let app = handlers::router(config.rate_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    if cli.ephemeral && !config.dev_mode {
        tracing::warn!("--ephemeral ignored: not in dev mode (set PAYDROP_ENV=dev)");
    }
    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("Paydrop server listening on {}", addr);

    // Connect info enables IP-based rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");

    if cleanup_on_exit {
        let db_path = config.database_path;
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        }
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
