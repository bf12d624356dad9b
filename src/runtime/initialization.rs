//! # Initialization
//!
//! Startup logic including rustls setup, tracing, metrics, cache and fetcher
//! construction, and server startup.

use crate::cache::KeyCache;
use crate::config::{Config, ServerConfig};
use crate::fetch::http::HttpKeyFetcher;
use crate::fetch::KeyFetcher;
use crate::observability;
use crate::server::{start_server, ServerState};
use anyhow::{Context, Result};
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Components produced by [`initialize`]
pub struct InitializationResult {
    pub cache: KeyCache,
    pub server_state: Arc<ServerState>,
    /// Completes when the server has shut down
    pub server_handle: JoinHandle<()>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("cache", &self.cache)
            .field(
                "server_ready",
                &self.server_state.is_ready.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

/// Process-wide setup shared by every subcommand
///
/// Installs the rustls crypto provider, the tracing subscriber and the
/// metrics registry, then logs build info.
///
/// # Errors
///
/// Fails if tracing or metrics were already initialised.
pub fn init_process() -> Result<()> {
    // Must happen before any rustls client is built
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    observability::init_tracing()?;
    observability::register_metrics().context("Failed to register metrics")?;

    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    Ok(())
}

/// Start the caching key proxy
///
/// Builds the cache and the upstream fetcher from `config`, spawns the HTTP
/// server and waits until it is accepting connections. The server runs until
/// `shutdown` resolves.
///
/// # Errors
///
/// Fails when no upstream endpoint is configured or the server does not
/// become ready within the configured startup timeout.
pub async fn initialize<S>(config: &Config, shutdown: S) -> Result<InitializationResult>
where
    S: Future<Output = ()> + Send + 'static,
{
    let fetcher: Arc<dyn KeyFetcher> = Arc::new(
        HttpKeyFetcher::new(&config.fetcher).context("Failed to create upstream key fetcher")?,
    );
    initialize_with_fetcher(config, fetcher, shutdown).await
}

/// [`initialize`] with an explicit fetcher
///
/// # Errors
///
/// Fails when the server does not become ready within the startup timeout.
pub async fn initialize_with_fetcher<S>(
    config: &Config,
    fetcher: Arc<dyn KeyFetcher>,
    shutdown: S,
) -> Result<InitializationResult>
where
    S: Future<Output = ()> + Send + 'static,
{
    let cache = KeyCache::new(config.cache);
    info!(
        default_ttl_secs = config.cache.default_ttl.as_secs(),
        fetch_timeout_secs = config.cache.fetch_timeout.as_secs(),
        "Key cache created"
    );

    let server_state = Arc::new(ServerState::new(cache.clone(), fetcher));

    let addr = config.server.socket_addr();
    let state_for_server = Arc::clone(&server_state);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(addr, state_for_server, shutdown).await {
            error!("HTTP server error: {}", e);
        }
    });

    wait_for_server_ready(&server_state, &server_handle, &config.server).await?;

    Ok(InitializationResult {
        cache,
        server_state,
        server_handle,
    })
}

async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = Duration::from_secs(server_config.startup_timeout_secs);
    let poll_interval = Duration::from_millis(server_config.poll_interval_ms);
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            break;
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}
