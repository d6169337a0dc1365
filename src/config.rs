use std::env;

use crate::payments::{PaymentDomain, WebhookSecret};
use crate::rate_limit::RateLimitConfig;

/// Runtime configuration, loaded once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    /// Live-mode Paystack secret key (signature check + transaction verify)
    pub paystack_live_secret: Option<String>,
    /// Test-mode Paystack secret key, so one webhook URL serves both modes
    pub paystack_test_secret: Option<String>,
    /// Accept unsigned webhooks. Non-production testing only; defaults off.
    pub webhook_bypass: bool,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub storage_bucket: String,
    /// Object path of the single deliverable inside the bucket
    pub file_id: String,
    pub download_limit: i64,
    pub signed_url_ttl_secs: u64,
    pub resend_api_key: Option<String>,
    pub email_from: String,
    /// Page where the buyer enters their email + password
    pub download_page_url: String,
    pub rate_limit: RateLimitConfig,
    pub dev_mode: bool,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("PAYDROP_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env_parse("PORT", 3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let webhook_bypass = env::var("PAYDROP_WEBHOOK_BYPASS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "paydrop.db".to_string()),
            download_page_url: env::var("DOWNLOAD_PAGE_URL")
                .unwrap_or_else(|_| format!("{}/download.html", base_url)),
            base_url,
            paystack_live_secret: env::var("PAYSTACK_SECRET_KEY").ok(),
            paystack_test_secret: env::var("PAYSTACK_TEST_SECRET_KEY").ok(),
            webhook_bypass,
            supabase_url: env::var("SUPABASE_URL").unwrap_or_default(),
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY").unwrap_or_default(),
            storage_bucket: env::var("SUPABASE_STORAGE_BUCKET")
                .unwrap_or_else(|_| "private".to_string()),
            file_id: env::var("FILE_ID").unwrap_or_else(|_| "guide.pdf".to_string()),
            download_limit: env_parse("DOWNLOAD_LIMIT", 3),
            signed_url_ttl_secs: env_parse("SIGNED_URL_TTL_SECS", 300),
            resend_api_key: env::var("RESEND_API_KEY").ok(),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Paydrop <noreply@example.com>".to_string()),
            rate_limit: RateLimitConfig::from_env(),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Webhook signing secrets in verification order: live first, then test.
    pub fn webhook_secrets(&self) -> Vec<WebhookSecret> {
        let mut secrets = Vec::new();
        if let Some(key) = &self.paystack_live_secret {
            secrets.push(WebhookSecret {
                domain: PaymentDomain::Live,
                key: key.clone(),
            });
        }
        if let Some(key) = &self.paystack_test_secret {
            secrets.push(WebhookSecret {
                domain: PaymentDomain::Test,
                key: key.clone(),
            });
        }
        secrets
    }
}
