//! kvcache startup probe
//!
//! Builds the caches the way an application would at process start and
//! verifies both with a short write/read/delete round.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{ensure, Context};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kvcache::{Cache, CacheConfig, CacheRegistry};

const PROBE_KEY: &str = "startup-probe";

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the registry, connecting the default cache eagerly
/// 4. Probe the default and auxiliary caches
#[tokio::main]
async fn main() -> ExitCode {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kvcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Cache startup failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = CacheConfig::from_env();
    info!(
        "Configuration loaded: backend={:?}, redis_addr={}, redis_db={}, namespace={}",
        config.backend, config.redis.addr, config.redis.db, config.redis.namespace
    );

    let registry = CacheRegistry::connect(config)
        .await
        .context("default cache unavailable")?;

    let default = registry.default_cache().await?;
    probe("default", &default).await?;
    probe("auxiliary", &registry.auxiliary_cache()).await?;

    info!("Cache probe complete");
    Ok(())
}

async fn probe(name: &str, cache: &Cache) -> anyhow::Result<()> {
    let stamp = format!("{}", std::process::id());

    cache
        .set_text(PROBE_KEY, &stamp, Duration::from_secs(30))
        .await
        .with_context(|| format!("{} cache: write failed", name))?;
    let read = cache
        .get_value(PROBE_KEY)
        .await
        .with_context(|| format!("{} cache: read failed", name))?;
    ensure!(read == stamp, "{} cache: read back '{}', expected '{}'", name, read, stamp);

    cache.del(PROBE_KEY).await?;
    ensure!(
        !cache.exists(PROBE_KEY).await?,
        "{} cache: probe key survived delete",
        name
    );

    info!(cache = name, backend = ?cache.kind(), "Cache probe ok");
    Ok(())
}
