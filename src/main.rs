//! Biblion Server - Library Books & Loans API
//!
//! Serves the REST API and runs the daily overdue-loan notifier.

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt,
};

use biblion::{
    api,
    config::{AppConfig, LogFormat, LoggingConfig, StorageBackend},
    repository::Repository,
    services::{
        email::{LogNotifier, Notifier, SmtpNotifier},
        scheduler::OverdueNotifier,
        Services,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(&config.logging);

    tracing::info!("Starting Biblion Server v{}", env!("CARGO_PKG_VERSION"));

    let repository = match config.database.backend {
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .connect(&config.database.url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations completed");

            Repository::postgres(pool)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on restart");
            Repository::in_memory()
        }
    };

    let notifier: Arc<dyn Notifier> = if config.email.enabled {
        Arc::new(SmtpNotifier::new(config.email.clone()))
    } else {
        tracing::warn!("Email delivery disabled, overdue notices will only be logged");
        Arc::new(LogNotifier)
    };

    let timezone = config.scheduler.time_zone()?;
    let services = Services::new(repository, notifier, timezone);

    let shutdown = CancellationToken::new();
    let scheduler = if config.scheduler.enabled {
        let job = OverdueNotifier::new(
            services.loans.clone(),
            services.notifier.clone(),
            &config.scheduler,
            config.email.overdue_message.clone(),
        )?;
        tracing::info!(
            "Overdue notifier scheduled with '{}' ({})",
            config.scheduler.overdue_cron,
            timezone
        );
        Some(job.spawn(shutdown.clone()))
    } else {
        None
    };

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };
    let app = api::router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Some(handle) = scheduler {
        let _ = handle.await;
    }

    Ok(())
}

/// Initialize tracing to stdout or a daily-rolling file
fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("biblion={},tower_http=debug", config.level).into());

    let (writer, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "biblion.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .init(),
    }

    guard
}

/// Resolve on Ctrl+C or when `shutdown` is cancelled elsewhere
async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown requested");
        }
        _ = shutdown.cancelled() => {}
    }
}
