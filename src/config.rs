use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub base_url: String,
    pub database_path: String,
    pub ledger_database_path: String,
    pub stripe_secret_key: String,
    /// Trusted webhook signing secrets, tried in order. More than one entry
    /// supports secret rotation and live/test dual environments.
    pub webhook_secrets: Vec<String>,
    pub checkout_success_url: String,
    pub checkout_cancel_url: String,
    /// Ledger retention in days. 0 = keep events forever.
    pub event_retention_days: i64,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("SUBSYNC_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let webhook_secrets = env::var("STRIPE_WEBHOOK_SECRETS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host,
            port,
            checkout_success_url: env::var("CHECKOUT_SUCCESS_URL")
                .unwrap_or_else(|_| format!("{}/app", base_url)),
            checkout_cancel_url: env::var("CHECKOUT_CANCEL_URL")
                .unwrap_or_else(|_| format!("{}/billing", base_url)),
            base_url,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "subsync.db".to_string()),
            ledger_database_path: env::var("LEDGER_DATABASE_PATH")
                .unwrap_or_else(|_| "subsync_events.db".to_string()),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            webhook_secrets,
            event_retention_days: env::var("EVENT_RETENTION_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
