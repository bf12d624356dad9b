//! # HTTP Server
//!
//! Caching key proxy plus metrics and health endpoints.
//!
//! Provides endpoints:
//! - `POST /api/secure-key` - Resolve a key through the cache (`{"service": ...}` → `{"key", "expiresIn"}`)
//! - `/metrics` - Prometheus metrics in text format
//! - `/healthz` - Liveness check (always returns 200)
//! - `/readyz` - Readiness check (returns 200 once the listener is bound)
//!
//! The server listens on `127.0.0.1:5000` by default (configurable via
//! `SERVER_BIND_ADDR` and `SERVER_PORT`). The key route has no caller
//! authentication of its own, so widen the bind address only behind a proxy
//! that authenticates callers.

use crate::cache::{CacheError, KeyCache};
use crate::constants::SECURE_KEY_ROUTE;
use crate::fetch::http::{ErrorResponse, SecureKeyRequest, SecureKeyResponse};
use crate::fetch::{FetchError, KeyFetcher};
use crate::observability::metrics;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub struct ServerState {
    pub cache: KeyCache,
    pub fetcher: Arc<dyn KeyFetcher>,
    pub is_ready: Arc<AtomicBool>,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("cache", &self.cache)
            .field("is_ready", &self.is_ready.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ServerState {
    pub fn new(cache: KeyCache, fetcher: Arc<dyn KeyFetcher>) -> Self {
        Self {
            cache,
            fetcher,
            is_ready: Arc::new(AtomicBool::new(false)),
        }
    }
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route(SECURE_KEY_ROUTE, post(secure_key_handler))
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` resolves
///
/// Marks the state ready once the listener is bound.
///
/// # Errors
///
/// Fails if the port cannot be bound or the server stops with an IO error.
pub async fn start_server<S>(
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown: S,
) -> anyhow::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let app = router(Arc::clone(&state));

    let listener = TcpListener::bind(addr).await?;

    info!("HTTP server listening on {}", addr);
    state.is_ready.store(true, Ordering::Relaxed);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    state.is_ready.store(false, Ordering::Relaxed);
    info!("HTTP server stopped");

    Ok(())
}

async fn secure_key_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<SecureKeyRequest>,
) -> Response {
    let service_id = request.service.trim();
    if service_id.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "service must not be empty".to_string(),
            None,
        );
    }

    match state.cache.resolve_with(service_id, &state.fetcher).await {
        Ok(key) => Json(SecureKeyResponse {
            key: key.secret.expose_secret().to_string(),
            expires_in: Some(key.expires_in.as_secs()),
        })
        .into_response(),
        Err(e) => {
            warn!(service.id = %service_id, reason = e.fetch_error().as_str(), "Key request failed");
            error_response(status_for(&e), e.to_string(), Some(e.fetch_error().as_str()))
        }
    }
}

fn status_for(error: &CacheError) -> StatusCode {
    match error.fetch_error() {
        FetchError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        FetchError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(status: StatusCode, error: String, reason: Option<&str>) -> Response {
    let body = ErrorResponse {
        error,
        reason: reason.map(str::to_string),
    };
    (status, Json(body)).into_response()
}

async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = metrics::gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        buffer,
    )
}

async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

async fn readyz_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    if state.is_ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
