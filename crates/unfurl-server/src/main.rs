//! unfurl server entrypoint.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use unfurl_api::{AppState, create_router};
use unfurl_core::ports::{CacheStore, Dependent, GeneratedStore};
use unfurl_db::{Database, PgCacheStore, PgGeneratedStore};
use unfurl_resolvers::{ReqwestFetcher, UrlGuard};

mod config;
mod sweep;
mod telemetry;

use crate::config::{LogFormat, ServerConfig};

#[derive(Parser)]
#[command(name = "unfurl")]
#[command(author, version, about = "Link preview and thumbnail server", long_about = None)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, env = "UNFURL_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration.
    #[arg(short, long)]
    bind: Option<String>,

    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }
    if let Some(format) = cli.log_format {
        config.log.format = format;
    }

    telemetry::init(&config.log)?;
    run(config).await
}

async fn run(config: ServerConfig) -> Result<()> {
    let settings = config.resolver_settings();

    let database = Database::connect(&config.database.url, &config.database.pool_options())
        .await
        .context("Failed to connect to database")?;
    database
        .migrate()
        .await
        .context("Failed to run migrations")?;
    info!("database ready");

    let cache_store: Arc<dyn CacheStore> = Arc::new(PgCacheStore::new(database.pool().clone()));
    let generated_store: Arc<dyn GeneratedStore> =
        Arc::new(PgGeneratedStore::new(database.pool().clone()));
    let fetcher = Arc::new(ReqwestFetcher::new(
        settings.request_timeout,
        UrlGuard::new(&settings.ignored_hosts),
    )?);

    let link_resolver = unfurl_resolvers::build(
        &settings,
        cache_store.clone(),
        generated_store,
        fetcher,
    )?;

    let sweeper = config.sweep_interval().map(|period| {
        let dependents: Vec<Arc<dyn Dependent>> = vec![link_resolver.generated_cache()];
        sweep::spawn(cache_store, dependents, period)
    });

    let state = Arc::new(AppState::new(Arc::new(link_resolver), Arc::new(database)));
    let router = create_router(state);

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    info!(address = %listener.local_addr()?, base_url = %settings.base_url, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    info!("shutdown complete");

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }
}
