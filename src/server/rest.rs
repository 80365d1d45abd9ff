// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! REST API server implementation using axum.
//!
//! # Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /generate-key?length=N` - Run BB84 and return the key record
//! - `GET /latest-key` - Last persisted key record
//! - `GET /api/v1/backends` - List backends
//! - `GET /api/v1/version` - Get server version
//!
//! Failures are returned as `{"success": false, "error", "code", "timestamp"}`
//! with the status code mapped from the error.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use super::ServerState;
use crate::backend::{BackendType, Gate};
use crate::config::{CorsConfig, ServerConfig};
use crate::error::{BackendError, Error, ExecutionError, Result, ValidationError};
use crate::protocol::{to_unix_seconds, KeyRecord};

/// Service identity reported by the liveness probe.
pub const SERVICE_NAME: &str = "quantum-key-generation";

type HandlerResult<T> = std::result::Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// REST server for key generation.
pub struct RestServer {
    state: Arc<ServerState>,
}

impl RestServer {
    /// Create a new REST server.
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    /// Bind to the configured address and serve until shutdown.
    pub async fn serve(self, config: &ServerConfig) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid REST address: {}", e)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Server(format!("Failed to bind REST server: {}", e)))?;

        self.serve_with_listener(listener).await
    }

    /// Serve on an already-bound listener until shutdown.
    pub async fn serve_with_listener(self, listener: TcpListener) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!(address = %addr, "Starting REST server");
        }

        let app = router(self.state.clone());
        let mut shutdown_rx = self.state.shutdown_receiver();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
                info!("REST server shutting down");
            })
            .await
            .map_err(|e| Error::Server(format!("REST server error: {}", e)))?;

        Ok(())
    }
}

/// Build the application router.
pub fn router(state: Arc<ServerState>) -> Router {
    let cors = cors_layer(&state.config.server.cors);

    Router::new()
        .route("/health", get(health_check))
        .route("/generate-key", get(generate_key))
        .route("/latest-key", get(latest_key))
        .route("/api/v1/backends", get(list_backends))
        .route("/api/v1/version", get(get_version))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allow_all {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

// =============================================================================
// Request/Response types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

/// Query parameters of `/generate-key`.
#[derive(Debug, Deserialize)]
struct GenerateParams {
    length: Option<usize>,
}

/// Successful key response.
#[derive(Debug, Serialize)]
struct KeyResponse {
    success: bool,
    key: KeyRecord,
    timestamp: f64,
}

impl KeyResponse {
    fn new(key: KeyRecord) -> Self {
        Self {
            success: true,
            key,
            timestamp: now(),
        }
    }
}

/// Backend list response.
#[derive(Debug, Serialize)]
struct BackendsResponse {
    backends: Vec<BackendSummary>,
    default_backend: Option<String>,
}

/// Backend summary.
#[derive(Debug, Serialize)]
struct BackendSummary {
    name: String,
    backend_type: BackendType,
    supported_gates: Vec<Gate>,
    max_batch_size: usize,
    seeded: bool,
    software_version: String,
}

/// Version response.
#[derive(Debug, Serialize)]
struct VersionResponse {
    version: String,
    name: String,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
    timestamp: f64,
}

fn now() -> f64 {
    to_unix_seconds(Utc::now())
}

fn error_response(err: &Error) -> (StatusCode, Json<ErrorResponse>) {
    (
        err.status_code(),
        Json(ErrorResponse {
            success: false,
            error: err.to_string(),
            code: err.code().to_string(),
            timestamp: now(),
        }),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Liveness probe. Does not touch the backend.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
    })
}

/// Run one protocol execution and persist the result.
async fn generate_key(
    State(state): State<Arc<ServerState>>,
    params: std::result::Result<Query<GenerateParams>, QueryRejection>,
) -> HandlerResult<KeyResponse> {
    let Query(params) = params.map_err(|rejection| {
        error_response(&Error::Validation(ValidationError::Field {
            field: "length".to_string(),
            message: rejection.body_text(),
        }))
    })?;

    let key_length = params
        .length
        .unwrap_or_else(|| state.simulator.default_key_length());
    debug!(key_length, "REST generate_key request");

    let timeout = Duration::from_secs(state.config.server.timeout_sec);
    let record = match tokio::time::timeout(timeout, state.simulator.generate_key(key_length)).await
    {
        Ok(Ok(record)) => record,
        Ok(Err(e)) => {
            error!(error = %e, code = e.code(), "Key generation failed");
            return Err(error_response(&e));
        }
        Err(_elapsed) => {
            let e = Error::Execution(ExecutionError::new(BackendError::Timeout(format!(
                "key generation did not finish within {} seconds",
                timeout.as_secs()
            ))));
            error!(error = %e, "Key generation timed out");
            return Err(error_response(&e));
        }
    };

    if let Some(store) = state.store.clone() {
        let to_save = record.clone();
        let saved = tokio::task::spawn_blocking(move || store.save(&to_save))
            .await
            .map_err(|e| Error::Server(format!("Task join error: {}", e)))
            .and_then(|r| r);
        if let Err(e) = saved {
            error!(error = %e, "Failed to persist generated key");
            return Err(error_response(&e));
        }
    }

    Ok(Json(KeyResponse::new(record)))
}

/// Most recently persisted key.
async fn latest_key(State(state): State<Arc<ServerState>>) -> HandlerResult<KeyResponse> {
    let store = state.store.clone().ok_or_else(|| {
        error_response(&Error::Backend(BackendError::NotFound(
            "key persistence is disabled".to_string(),
        )))
    })?;

    let loaded = tokio::task::spawn_blocking(move || store.load_latest())
        .await
        .map_err(|e| Error::Server(format!("Task join error: {}", e)))
        .and_then(|r| r);

    match loaded {
        Ok(Some(record)) => Ok(Json(KeyResponse::new(record))),
        Ok(None) => Err(error_response(&Error::Backend(BackendError::NotFound(
            "no key has been generated yet".to_string(),
        )))),
        Err(e) => {
            error!(error = %e, "Failed to load latest key");
            Err(error_response(&e))
        }
    }
}

/// List backends endpoint.
async fn list_backends(State(state): State<Arc<ServerState>>) -> Json<BackendsResponse> {
    let mut backends = Vec::new();

    for name in state.registry.list() {
        if let Ok(backend) = state.registry.get(&name) {
            match backend.get_backend_info().await {
                Ok(info) => backends.push(BackendSummary {
                    name: info.name,
                    backend_type: info.backend_type,
                    supported_gates: info.supported_gates,
                    max_batch_size: info.max_batch_size,
                    seeded: info.seeded,
                    software_version: info.software_version,
                }),
                Err(e) => warn!(backend = %name, error = %e, "Backend info unavailable"),
            }
        }
    }

    Json(BackendsResponse {
        backends,
        default_backend: state.registry.default_backend_name(),
    })
}

/// Get version endpoint.
async fn get_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        name: "QKD Service".to_string(),
    })
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}
