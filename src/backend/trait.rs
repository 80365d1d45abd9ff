// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Quantum execution backend trait definition.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::BackendError;

/// Type of backend (simulator or hardware).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Local or remote simulator
    Simulator,
    /// Real quantum hardware
    Hardware,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Simulator => write!(f, "simulator"),
            BackendType::Hardware => write!(f, "hardware"),
        }
    }
}

/// Health status of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend is fully operational
    Healthy,
    /// Backend is operational but with degraded performance
    Degraded,
    /// Backend is not available
    Unavailable,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unavailable => "unavailable",
        }
    }
}

/// Single-qubit gates needed to prepare and rotate BB84 states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gate {
    /// Pauli X (bit flip)
    X,
    /// Hadamard (basis change)
    H,
}

/// A one-qubit circuit: start in |0⟩, apply `ops` in order, measure in the
/// computational basis into one classical bit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QubitCircuit {
    pub ops: Vec<Gate>,
}

impl QubitCircuit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn x(mut self) -> Self {
        self.ops.push(Gate::X);
        self
    }

    pub fn h(mut self) -> Self {
        self.ops.push(Gate::H);
        self
    }
}

/// Batch execution request.
#[derive(Debug, Clone)]
pub struct ExecuteBatchRequest {
    /// Batch ID, for log correlation
    pub batch_id: String,
    /// Circuits, executed independently
    pub circuits: Vec<QubitCircuit>,
    /// Shots per circuit
    pub shots: u32,
}

/// Measurement counts for one circuit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskResult {
    /// Outcome counts keyed by bitstring ("0" / "1")
    pub counts: HashMap<String, u32>,
    /// Shots executed
    pub shots: u32,
}

/// Results of a batch, in submission order.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub results: Vec<TaskResult>,
}

/// Static description of a backend.
#[derive(Debug, Clone, Serialize)]
pub struct BackendInfo {
    /// Backend name
    pub name: String,
    /// Type of backend
    pub backend_type: BackendType,
    /// Supported gates
    pub supported_gates: Vec<Gate>,
    /// Largest batch accepted in one call
    pub max_batch_size: usize,
    /// Whether results are reproducible from a fixed seed
    pub seeded: bool,
    /// Software version
    pub software_version: String,
}

/// The trait that all quantum execution backends must implement.
///
/// Implementations must return exactly one [`TaskResult`] per submitted
/// circuit, in submission order, and must tolerate concurrent batches.
#[async_trait]
pub trait QuantumBackend: Send + Sync {
    /// Get the backend name.
    fn name(&self) -> &str;

    /// Get the backend type.
    fn backend_type(&self) -> BackendType;

    /// Execute a batch of circuits.
    async fn execute_batch(&self, request: ExecuteBatchRequest)
        -> Result<BatchResult, BackendError>;

    /// Describe the backend.
    async fn get_backend_info(&self) -> Result<BackendInfo, BackendError>;

    /// Check backend health.
    async fn health_check(&self) -> Result<HealthStatus, BackendError>;
}
