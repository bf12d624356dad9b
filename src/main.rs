//! # Secure Key Cache
//!
//! Binary entry point.
//!
//! ## Usage
//!
//! ```bash
//! # Run the caching key proxy (POST /api/secure-key, /metrics, /healthz, /readyz)
//! KEY_FETCH_ENDPOINT=https://keys.internal/api/secure-key secure-key-cache serve
//!
//! # Serve on a custom port
//! secure-key-cache serve --port 8080
//!
//! # Listen on all interfaces (only behind an authenticating proxy)
//! secure-key-cache serve --bind 0.0.0.0
//!
//! # One-shot fetch through the configured upstream (prints length, not the key)
//! secure-key-cache fetch --service maps
//!
//! # Print the key itself
//! secure-key-cache fetch --service maps --reveal
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secure_key_cache::{load_config, runtime, HttpKeyFetcher, KeyCache, KeyFetcher};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::info;

/// In-process cache for short-lived API keys
#[derive(Parser)]
#[command(name = "secure-key-cache")]
#[command(about = "Caching proxy for short-lived API keys", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve cached keys over HTTP until interrupted
    Serve {
        /// Port to listen on (overrides SERVER_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Interface to listen on (overrides SERVER_BIND_ADDR)
        #[arg(short, long)]
        bind: Option<IpAddr>,
    },
    /// Fetch a single key through the configured upstream
    Fetch {
        /// Service identifier, e.g. `maps` or `stripe`
        #[arg(short, long)]
        service: String,

        /// Print the key value instead of its length
        #[arg(long)]
        reveal: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    runtime::init_process()?;
    let mut config = load_config();

    match cli.command {
        Commands::Serve { port, bind } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(bind) = bind {
                config.server.bind_addr = bind;
            }
            info!("Starting secure key cache on {}", config.server.socket_addr());

            let result = runtime::initialize(&config, shutdown_signal()).await?;
            result
                .server_handle
                .await
                .context("HTTP server task panicked")?;
        }
        Commands::Fetch { service, reveal } => {
            let fetcher: Arc<dyn KeyFetcher> = Arc::new(HttpKeyFetcher::new(&config.fetcher)?);
            let cache = KeyCache::new(config.cache);
            let key = cache.resolve_with(&service, &fetcher).await?;

            println!("service:    {service}");
            if reveal {
                println!("key:        {}", key.secret.expose_secret());
            } else {
                println!("key:        <{} bytes, use --reveal to print>", key.secret.len());
            }
            println!("expires in: {}s", key.expires_in.as_secs());
            if let Ok(ttl) = chrono::Duration::from_std(key.expires_in) {
                println!("expires at: {}", (chrono::Utc::now() + ttl).to_rfc3339());
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
