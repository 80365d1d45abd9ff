// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP service for key generation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            REST (axum, 8081)             │
//! │  /health  /generate-key  /latest-key     │
//! ├─────────────────────────────────────────┤
//! │     Bb84Simulator      │    KeyStore     │
//! ├────────────────────────┴────────────────┤
//! │           Backend Registry               │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use qkd_service::backend::BackendRegistry;
//! use qkd_service::config::Config;
//!
//! let config = Config::load(None)?;
//! let registry = Arc::new(BackendRegistry::from_config(&config.backends)?);
//! qkd_service::server::run_server(&config, registry).await?;
//! ```

pub mod rest;

pub use rest::RestServer;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::backend::BackendRegistry;
use crate::config::Config;
use crate::error::Result;
use crate::protocol::Bb84Simulator;
use crate::storage::KeyStore;

/// Shared state for request handlers.
pub struct ServerState {
    /// Backend registry
    pub registry: Arc<BackendRegistry>,

    /// Protocol driver bound to the default backend
    pub simulator: Bb84Simulator,

    /// Latest-key store, absent when persistence is disabled
    pub store: Option<Arc<KeyStore>>,

    /// Effective configuration
    pub config: Config,

    /// Shutdown signal sender
    shutdown_tx: watch::Sender<bool>,

    /// Shutdown signal receiver
    shutdown_rx: watch::Receiver<bool>,
}

impl ServerState {
    /// Create server state using the registry's default backend.
    pub fn new(registry: Arc<BackendRegistry>, config: &Config) -> Result<Self> {
        let backend = registry.get_default()?;
        let simulator = Bb84Simulator::new(backend, &config.protocol);
        let store = KeyStore::from_config(&config.storage).map(Arc::new);
        Ok(Self::with_parts(registry, simulator, store, config))
    }

    /// Create server state from already-built parts.
    pub fn with_parts(
        registry: Arc<BackendRegistry>,
        simulator: Bb84Simulator,
        store: Option<Arc<KeyStore>>,
        config: &Config,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            registry,
            simulator,
            store,
            config: config.clone(),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Get a shutdown receiver.
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Run the REST server until Ctrl-C.
pub async fn run_server(config: &Config, registry: Arc<BackendRegistry>) -> Result<()> {
    let state = Arc::new(ServerState::new(registry, config)?);
    let rest_server = RestServer::new(state.clone());

    info!(
        host = %config.server.host,
        port = config.server.port,
        backend = %state.simulator.backend_name(),
        persist = state.store.is_some(),
        "Starting key generation server"
    );

    let state_for_signal = state.clone();
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received shutdown signal, initiating graceful shutdown");
            state_for_signal.shutdown();
        }
    });

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_sec);
    let mut shutdown_rx = state.shutdown_receiver();
    let server = rest_server.serve(&config.server);
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return result,
        _ = shutdown_rx.changed() => {}
    }

    // In-flight requests get a bounded grace period once shutdown starts
    info!(timeout_secs = config.server.shutdown_timeout_sec, "Waiting for shutdown to complete");
    match tokio::time::timeout(shutdown_timeout, &mut server).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Shutdown timed out, dropping in-flight requests");
            Ok(())
        }
    }
}
