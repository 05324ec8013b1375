mod handlers;
mod metrics;
mod routes;


use algoforge_common::config::{LogFormat, ServiceConfig, StoreBackend};
use algoforge_engine::{JobStore, LanguageConfigManager, Materializer, MemoryJobStore, Orchestrator, RedisJobStore};
use anyhow::{anyhow, Context, Result};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new().merge(routes::routes()).with_state(state)
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::from_env().map_err(|e| anyhow!(e))?;
    init_tracing(config.log_format);

    info!("AlgoForge API booting...");

    let languages = LanguageConfigManager::load_or_default(&config.languages_config)?;
    for language in languages.list() {
        info!(
            language = %language.name,
            timeout_ms = language.timeout_ms,
            "Language configured"
        );
    }

    let store: Arc<dyn JobStore> = match config.store {
        StoreBackend::Redis => {
            let store = RedisJobStore::connect(&config.redis_url)
                .await
                .with_context(|| format!("Failed to connect to Redis at {}", config.redis_url))?;
            info!("Connected to Redis: {}", config.redis_url);
            Arc::new(store)
        }
        StoreBackend::Memory => {
            warn!("Using in-memory job store, history is lost on restart");
            Arc::new(MemoryJobStore::new())
        }
    };

    let materializer = Materializer::new(config.storage_root.clone());
    materializer
        .init()
        .await
        .with_context(|| format!("Failed to prepare storage root {}", config.storage_root.display()))?;
    info!(storage_root = %config.storage_root.display(), "Storage ready");

    let orchestrator = Orchestrator::new(
        materializer,
        languages,
        store,
        config.max_concurrent,
        Duration::from_millis(config.admission_timeout_ms),
    );
    info!(
        max_concurrent = config.max_concurrent,
        admission_timeout_ms = config.admission_timeout_ms,
        "Admission gate configured"
    );

    let state = Arc::new(AppState {
        orchestrator: Arc::new(orchestrator),
    });

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("HTTP server listening on {}", config.bind_addr);

    axum::serve(listener, app(state)).await.context("Server error")?;
    Ok(())
}
