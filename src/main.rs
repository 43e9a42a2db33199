use std::sync::Arc;

use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subsync::config::Config;
use subsync::db::{create_pool, init_db, init_ledger_db, queries, AppState};
use subsync::handlers;
use subsync::models::CreateAccount;
use subsync::payments::StripeClient;

#[derive(Parser, Debug)]
#[command(name = "subsync")]
#[command(about = "Stripe billing webhook reconciliation service")]
struct Cli {
    /// Seed the database with a dev account
    #[arg(long)]
    seed: bool,

    /// Delete databases on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Seeds the database with a dev account for local webhook testing.
/// Only runs in dev mode and when the database is empty.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let count = queries::count_accounts(&conn).expect("Failed to count accounts");
    if count > 0 {
        tracing::info!("Database already has data, skipping seed");
        return;
    }

    let account = queries::create_account(
        &conn,
        &CreateAccount {
            email: Some("dev@subsync.local".to_string()),
            billing_customer_id: None,
        },
    )
    .expect("Failed to create dev account");

    tracing::info!("============================================");
    tracing::info!("DEV ACCOUNT SEEDED");
    tracing::info!("Account ID: {}", account.id);
    tracing::info!("Email: dev@subsync.local");
    tracing::info!("============================================");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "subsync=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    if config.webhook_secrets.is_empty() {
        tracing::warn!("STRIPE_WEBHOOK_SECRETS is not set - all webhooks will be rejected");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    let ledger_pool =
        create_pool(&config.ledger_database_path).expect("Failed to create ledger database pool");

    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }
    {
        let conn = ledger_pool.get().expect("Failed to get ledger connection");
        init_ledger_db(&conn).expect("Failed to initialize ledger database");
    }

    let state = AppState {
        db: db_pool,
        ledger: ledger_pool,
        billing: Arc::new(StripeClient::new(&config.stripe_secret_key)),
        webhook_secrets: config.webhook_secrets.clone(),
        checkout_success_url: config.checkout_success_url.clone(),
        checkout_cancel_url: config.checkout_cancel_url.clone(),
    };

    // Purge old ledger entries on startup (0 = keep forever)
    if config.event_retention_days > 0 {
        let conn = state.ledger.get().expect("Failed to get ledger connection for purge");
        match queries::purge_old_events(&conn, config.event_retention_days) {
            Ok(count) if count > 0 => {
                tracing::info!(
                    "Purged {} ledger entries older than {} days",
                    count,
                    config.event_retention_days
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Failed to purge old ledger entries: {}", e);
            }
        }
    }

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set SUBSYNC_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    let app = Router::new()
        .merge(handlers::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();
    let ledger_path = config.ledger_database_path.clone();

    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: databases will be deleted on exit");
    }

    tracing::info!("subsync server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral databases...");
        for path in [&db_path, &ledger_path] {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!("Failed to remove {}: {}", path, e);
            } else {
                tracing::info!("Removed {}", path);
            }
            let _ = std::fs::remove_file(format!("{}-wal", path));
            let _ = std::fs::remove_file(format!("{}-shm", path));
        }
        tracing::info!("Ephemeral cleanup complete");
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
