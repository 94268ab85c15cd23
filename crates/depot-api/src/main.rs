use depot_api::{build_router, AppState};
use depot_core::Config;
use depot_processing::ProcessorRegistry;
use depot_storage::{BackendRegistry, FsBackend};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let mut cache = FsBackend::new(&config.cache_root).await?;
    if let Some(max_size) = config.max_cache_size {
        cache = cache.with_max_size(max_size);
    }
    let store = FsBackend::new(&config.store_root).await?;

    let backends = BackendRegistry::new()
        .insert("cache", Arc::new(cache), true)
        .insert("store", Arc::new(store), false);

    let state = Arc::new(AppState::new(
        backends,
        ProcessorRegistry::new(),
        config.clone(),
    ));
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %config.bind_addr(), "depot listening");
    axum::serve(listener, router).await?;

    Ok(())
}
