use std::sync::Arc;

use clap::Parser;
use hookreg_server::cli::{Cli, Command};
use hookreg_server::config::{AppConfig, LogFormat, StorageBackend};
use hookreg_server::rest::{self, AppState};
use hookreg_server::service::RegistryService;
use hookreg_storage::postgres::migrations::run_migrations;
use hookreg_storage::{DocumentStore, InMemoryStore, PostgresStore};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log.format {
        LogFormat::Json => {
            registry.with(tracing_subscriber::fmt::layer().json()).init();
        }
        LogFormat::Pretty => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(&config);

    match cli.command {
        Some(Command::Migrate) => run_migrate(&config).await,
        Some(Command::Serve) | None => run_serve(config).await,
    }
}

async fn run_migrate(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("running database migrations");
    let store = PostgresStore::connect(&config.database.url, config.database.max_connections).await?;
    run_migrations(store.pool()).await?;
    tracing::info!("migrations completed successfully");
    Ok(())
}

async fn run_serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("using the in-memory backend, records are lost on shutdown");
            serve(&config, InMemoryStore::new()).await
        }
        StorageBackend::Postgres => {
            let store =
                PostgresStore::connect(&config.database.url, config.database.max_connections)
                    .await?;
            run_migrations(store.pool()).await?;
            serve(&config, store).await
        }
    }
}

async fn serve<S: DocumentStore + 'static>(
    config: &AppConfig,
    store: S,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = Arc::new(RegistryService::new(Arc::new(store)));

    if let Some(admin) = &config.admin.username
        && service.ensure_admin(admin).await?
    {
        tracing::info!(username = %admin, "admin account bootstrapped");
    }

    let rest_addr: std::net::SocketAddr = config.rest_addr().parse()?;
    let router = rest::create_router(AppState { service });

    tracing::info!(
        %rest_addr,
        backend = ?config.storage.backend,
        "starting hookreg server"
    );

    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = ctrl_c => { tracing::info!("received SIGINT"); }
                _ = sigterm.recv() => { tracing::info!("received SIGTERM"); }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to register SIGTERM handler, using SIGINT only");
            let _ = ctrl_c.await;
            tracing::info!("received SIGINT");
        }
    }
}
