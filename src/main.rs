use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ordermail::config::Config;
use ordermail::notifications::smtp::{LogMailer, SmtpMailer};
use ordermail::notifications::{Mailer, PendingOrderEmail};
use ordermail::orders::SqliteOrderRepository;
use ordermail::settings::{SettingsStore, SqliteSettings};
use ordermail::AppState;

#[derive(Parser, Debug)]
#[command(name = "ordermail")]
#[command(author, version, about = "A lightweight order email notification service", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "ordermail.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Ordermail v{}", env!("CARGO_PKG_VERSION"));

    // Ensure data directory exists
    std::fs::create_dir_all(&config.server.data_dir).with_context(|| {
        format!(
            "Failed to create data directory: {}",
            config.server.data_dir.display()
        )
    })?;

    // Initialize database
    let db = ordermail::db::init(&config.server.data_dir).await?;

    // Build the mail dispatcher
    let mailer: Arc<dyn Mailer> = if config.smtp.is_configured() {
        Arc::new(SmtpMailer::from_config(&config.smtp)?)
    } else {
        tracing::warn!("SMTP not configured, emails will be logged and dropped");
        Arc::new(LogMailer)
    };

    let settings: Arc<dyn SettingsStore> = Arc::new(SqliteSettings::new(db.clone()));
    let orders = Arc::new(SqliteOrderRepository::new(db.clone()));

    let notifier = Arc::new(PendingOrderEmail::new(
        settings.clone(),
        orders.clone(),
        mailer,
        config.site.title.clone(),
        config.site.admin_email.clone(),
    ));

    // Create app state and router
    let state = Arc::new(AppState::new(
        config.clone(),
        db,
        settings,
        orders,
        notifier,
    ));
    let app = ordermail::api::create_router(state);

    // Start API server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
