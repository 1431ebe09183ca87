//! `vault` — secrets vault binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise telemetry (JSON logs, optional OTLP spans).
//! 3. Derive the field key and build the [`EnvelopeCodec`].
//! 4. Create the record store.
//! 5. Build the Axum router and serve plain HTTP or TLS.

mod config;
mod crypto;
mod export;
mod records;
mod server;
mod store;
mod telemetry;

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use config::{Config, SecretSource};
use crypto::EnvelopeCodec;
use server::state::AppState;
use store::MemoryStore;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        tls = cfg.tls_paths().is_some(),
        "vault starting"
    );

    // -----------------------------------------------------------------------
    // 3. Field encryption
    // -----------------------------------------------------------------------
    let (secret, source) = cfg.encryption_secret();
    if source == SecretSource::Fallback {
        warn!("ENCRYPTION_KEY is not set; sealing with the built-in fallback secret");
    }
    let codec = EnvelopeCodec::from_secret(secret);

    // -----------------------------------------------------------------------
    // 4. Store
    // -----------------------------------------------------------------------
    let store = MemoryStore::new();

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(codec, store, cfg.access_token.clone(), source);
    let router = server::router::build(state, Duration::from_secs(cfg.request_timeout_secs));

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    match cfg.tls_paths() {
        Some((cert_path, key_path)) => {
            let cert = tokio::fs::read(cert_path)
                .await
                .with_context(|| format!("failed to read {cert_path}"))?;
            let key = tokio::fs::read(key_path)
                .await
                .with_context(|| format!("failed to read {key_path}"))?;
            let tls_config = server::tls::build_server_config(&cert, &key)?;
            info!(addr = %addr, "listening (TLS)");
            server::tls::serve(listener, tls_config, router).await?;
        }
        None => {
            info!(addr = %addr, "listening");
            axum::serve(listener, router).await?;
        }
    }

    Ok(())
}
