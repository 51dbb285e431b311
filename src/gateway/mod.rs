// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Axum-based HTTP gateway hosting the callable role endpoints.
//!
//! - Request body size limit (64KB)
//! - Request timeouts (30s default)
//! - Per-client sliding-window limit on role mutations
//! - `/health` and `/metrics` for operators

use crate::config::{Config, GatewayConfig};
use crate::identity::{self, CallerResolver, DirectoryBackend, RoleGateway};
use crate::observability::Metrics;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub mod api;

/// Maximum request body size (64KB) — prevents memory exhaustion
pub const MAX_BODY_SIZE: usize = 65_536;
/// Default request timeout (30s)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
/// Sliding window used by gateway rate limiting.
pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;

#[derive(Debug)]
struct SlidingWindowRateLimiter {
    limit_per_window: u32,
    window: Duration,
    requests: Mutex<HashMap<String, Vec<Instant>>>,
}

impl SlidingWindowRateLimiter {
    fn new(limit_per_window: u32, window: Duration) -> Self {
        Self {
            limit_per_window,
            window,
            requests: Mutex::new(HashMap::new()),
        }
    }

    fn allow(&self, key: &str) -> bool {
        if self.limit_per_window == 0 {
            return true;
        }

        let now = Instant::now();
        let cutoff = now.checked_sub(self.window).unwrap_or_else(Instant::now);

        let mut requests = self
            .requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        // Drop idle keys so the map does not grow with every client ever seen.
        requests.retain(|_, hits| hits.last().is_some_and(|t| *t > cutoff));

        let entry = requests.entry(key.to_owned()).or_default();
        entry.retain(|instant| *instant > cutoff);

        if entry.len() >= self.limit_per_window as usize {
            return false;
        }

        entry.push(now);
        true
    }
}

#[derive(Debug)]
pub struct GatewayRateLimiter {
    mutations: SlidingWindowRateLimiter,
}

impl GatewayRateLimiter {
    pub fn new(mutations_per_minute: u32) -> Self {
        let window = Duration::from_secs(RATE_LIMIT_WINDOW_SECS);
        Self {
            mutations: SlidingWindowRateLimiter::new(mutations_per_minute, window),
        }
    }

    pub fn allow_mutation(&self, key: &str) -> bool {
        self.mutations.allow(key)
    }
}

pub(crate) fn client_key_from_headers(headers: &HeaderMap) -> String {
    for header_name in ["X-Forwarded-For", "X-Real-IP"] {
        if let Some(value) = headers.get(header_name).and_then(|v| v.to_str().ok()) {
            let first = value.split(',').next().unwrap_or("").trim();
            if !first.is_empty() {
                return first.to_owned();
            }
        }
    }
    "unknown".into()
}

/// True unless `host` is a loopback address or `localhost`.
pub fn is_public_bind(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return false;
    }
    match host.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
        Ok(ip) => !ip.is_loopback(),
        Err(_) => true,
    }
}

/// Socket address for `host:port`. `host` is an IP literal or `localhost`;
/// other hostnames are not resolved.
pub fn bind_addr(host: &str, port: u16) -> Result<SocketAddr> {
    let ip = if host.eq_ignore_ascii_case("localhost") {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        host.trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .with_context(|| format!("Invalid bind address {host}:{port} (expected an IP address or localhost)"))?
    };
    Ok(SocketAddr::new(ip, port))
}

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub roles: RoleGateway,
    pub callers: Arc<dyn CallerResolver>,
    pub rate_limiter: Arc<GatewayRateLimiter>,
    pub metrics: Arc<Metrics>,
    /// Monotonic start instant for uptime calculation.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        backend: DirectoryBackend,
        bootstrap_email: Option<String>,
        mutations_per_minute: u32,
    ) -> Result<Self> {
        Ok(Self {
            roles: RoleGateway::new(backend.directory, bootstrap_email),
            callers: backend.callers,
            rate_limiter: Arc::new(GatewayRateLimiter::new(mutations_per_minute)),
            metrics: Arc::new(Metrics::new().context("Failed to register metrics")?),
            started_at: Instant::now(),
        })
    }
}

/// Assemble the router with its middleware stack.
pub fn build_router(state: AppState, config: &GatewayConfig) -> Router {
    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    let timeout_secs = if config.request_timeout_secs == 0 {
        REQUEST_TIMEOUT_SECS
    } else {
        config.request_timeout_secs
    };

    Router::new()
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .merge(api::routes())
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(timeout_secs),
        ))
        .layer(security_headers)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP gateway until Ctrl-C.
pub async fn run_gateway(config: Config) -> Result<()> {
    let gateway = &config.gateway;
    // ── Security: refuse public bind without explicit opt-in ──
    if is_public_bind(&gateway.host) && !gateway.allow_public_bind {
        anyhow::bail!(
            "Refusing to bind to {} — the role gateway would be exposed to the network.\n\
             Fix: use --host 127.0.0.1 (default) behind a reverse proxy, or set\n\
             [gateway] allow_public_bind = true in config.toml.",
            gateway.host
        );
    }

    let backend = identity::create_directory(&config.directory)?;
    let directory_name = backend.directory.name().to_string();
    let bootstrap = config.bootstrap.admin_email.clone();
    if bootstrap.is_none() {
        tracing::info!("no bootstrap admin configured; restoreBootstrapAdmin is disabled");
    }
    let state = AppState::new(backend, bootstrap, gateway.mutations_per_minute)?;

    let addr = bind_addr(&gateway.host, gateway.port)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(addr = %local, directory = %directory_name, "role gateway listening");

    let app = build_router(state, gateway);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("role gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// AXUM HANDLERS
// ══════════════════════════════════════════════════════════════════════════════

/// GET /health — always public (no secrets leaked)
async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(api::types::HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        directory: state.roles.directory().name().to_string(),
        bootstrap_configured: state.roles.bootstrap_email().is_some(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

/// GET /metrics — Prometheus text format
async fn handle_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
