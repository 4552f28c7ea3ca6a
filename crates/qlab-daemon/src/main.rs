//! qlab-daemon entry point.
//!
//! Sets up tracing, loads layered config, builds the shared state, wires
//! middleware, and starts the HTTP server. Route handlers live in
//! `routes.rs`; shared state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use qlab_config::{report_unused_keys, UnusedKeyPolicy};
use qlab_daemon::{routes, state};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

const DEFAULT_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 8000);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let loaded = qlab_config::load_from_env()?;
    info!(config_hash = %loaded.config_hash, "config loaded");

    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for ptr in &report.unused_leaf_pointers {
        warn!(pointer = %ptr, "unused config key");
    }

    let shared = Arc::new(
        state::AppState::from_config_json(&loaded.config_json).context("invalid stream config")?,
    );

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = match bind_addr_from_env() {
        Some(addr) => addr,
        None => state::daemon_addr_from_config(&loaded.config_json)
            .context("invalid daemon config")?
            .unwrap_or_else(|| SocketAddr::from(DEFAULT_ADDR)),
    };
    info!("qlab-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// `QLAB_DAEMON_ADDR` wins over `daemon.addr` in config. Unparseable values are ignored.
fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("QLAB_DAEMON_ADDR").ok()?.parse().ok()
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ]
    .iter()
    .filter_map(|o| HeaderValue::from_str(o).ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET])
        .allow_headers(tower_http::cors::Any)
}
