// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared test utilities for protocol and service tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::backend::r#trait::{
    BackendInfo, BackendType, BatchResult, ExecuteBatchRequest, Gate, HealthStatus,
    QuantumBackend, QubitCircuit, TaskResult,
};
use crate::error::BackendError;
use crate::protocol::Clock;

/// Clock frozen at a whole number of unix seconds.
pub fn fixed_clock(secs: i64) -> Clock {
    let at = DateTime::from_timestamp(secs, 0).unwrap();
    Arc::new(move || at)
}

/// Deterministic outcome: "1" when the circuit flips the qubit.
fn echo_outcome(circuit: &QubitCircuit) -> &'static str {
    if circuit.ops.contains(&Gate::X) {
        "1"
    } else {
        "0"
    }
}

fn echo_batch(request: &ExecuteBatchRequest) -> BatchResult {
    BatchResult {
        results: request
            .circuits
            .iter()
            .map(|c| TaskResult {
                counts: HashMap::from([(echo_outcome(c).to_string(), request.shots)]),
                shots: request.shots,
            })
            .collect(),
    }
}

fn mock_info(name: &str, backend_type: BackendType) -> BackendInfo {
    BackendInfo {
        name: name.to_string(),
        backend_type,
        supported_gates: vec![Gate::X, Gate::H],
        max_batch_size: 65536,
        seeded: true,
        software_version: "1.0.0-mock".to_string(),
    }
}

/// Mock backend reporting the prepared bit as the measured bit.
///
/// Matches an ideal measurement on every position where Bob's basis agrees
/// with Alice's, which is all sifting needs.
pub struct EchoBackend {
    pub name: String,
    calls: AtomicUsize,
    last_batch_size: AtomicUsize,
    last_shots: AtomicU32,
}

impl EchoBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
            last_batch_size: AtomicUsize::new(0),
            last_shots: AtomicU32::new(0),
        }
    }

    /// Number of batches executed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_batch_size(&self) -> usize {
        self.last_batch_size.load(Ordering::SeqCst)
    }

    pub fn last_shots(&self) -> u32 {
        self.last_shots.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuantumBackend for EchoBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Simulator
    }

    async fn execute_batch(
        &self,
        request: ExecuteBatchRequest,
    ) -> Result<BatchResult, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_batch_size
            .store(request.circuits.len(), Ordering::SeqCst);
        self.last_shots.store(request.shots, Ordering::SeqCst);
        Ok(echo_batch(&request))
    }

    async fn get_backend_info(&self) -> Result<BackendInfo, BackendError> {
        Ok(mock_info(&self.name, BackendType::Simulator))
    }

    async fn health_check(&self) -> Result<HealthStatus, BackendError> {
        Ok(HealthStatus::Healthy)
    }
}

/// Mock backend that always returns errors.
pub struct FailingBackend {
    pub name: String,
    error: BackendError,
}

impl FailingBackend {
    pub fn new(name: &str) -> Self {
        Self::with_error(
            name,
            BackendError::ExecutionFailed("mock execution failure".to_string()),
        )
    }

    pub fn with_error(name: &str, error: BackendError) -> Self {
        Self {
            name: name.to_string(),
            error,
        }
    }
}

#[async_trait]
impl QuantumBackend for FailingBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Simulator
    }

    async fn execute_batch(
        &self,
        _request: ExecuteBatchRequest,
    ) -> Result<BatchResult, BackendError> {
        Err(self.error.clone())
    }

    async fn get_backend_info(&self) -> Result<BackendInfo, BackendError> {
        Err(BackendError::Unavailable("mock backend unavailable".to_string()))
    }

    async fn health_check(&self) -> Result<HealthStatus, BackendError> {
        Err(BackendError::Unavailable("mock backend unavailable".to_string()))
    }
}

/// How [`CorruptingBackend`] damages a batch.
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// Drop the last result
    Truncate,
    /// Replace one task's counts with a two-bit outcome
    CorruptTask(usize),
}

/// Mock backend returning echo results with one injected fault.
pub struct CorruptingBackend {
    fault: Fault,
}

impl CorruptingBackend {
    pub fn new(fault: Fault) -> Self {
        Self { fault }
    }
}

#[async_trait]
impl QuantumBackend for CorruptingBackend {
    fn name(&self) -> &str {
        "corrupting"
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Hardware
    }

    async fn execute_batch(
        &self,
        request: ExecuteBatchRequest,
    ) -> Result<BatchResult, BackendError> {
        let mut batch = echo_batch(&request);
        match self.fault {
            Fault::Truncate => {
                batch.results.pop();
            }
            Fault::CorruptTask(i) => {
                if let Some(result) = batch.results.get_mut(i) {
                    result.counts = HashMap::from([("10".to_string(), request.shots)]);
                }
            }
        }
        Ok(batch)
    }

    async fn get_backend_info(&self) -> Result<BackendInfo, BackendError> {
        Ok(mock_info("corrupting", BackendType::Hardware))
    }

    async fn health_check(&self) -> Result<HealthStatus, BackendError> {
        Ok(HealthStatus::Degraded)
    }
}

/// Mock backend whose batches never complete.
pub struct PendingBackend {
    started: AtomicUsize,
}

impl PendingBackend {
    pub fn new() -> Self {
        Self {
            started: AtomicUsize::new(0),
        }
    }

    /// Number of batches that reached the backend.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuantumBackend for PendingBackend {
    fn name(&self) -> &str {
        "pending"
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Simulator
    }

    async fn execute_batch(
        &self,
        _request: ExecuteBatchRequest,
    ) -> Result<BatchResult, BackendError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn get_backend_info(&self) -> Result<BackendInfo, BackendError> {
        Ok(mock_info("pending", BackendType::Simulator))
    }

    async fn health_check(&self) -> Result<HealthStatus, BackendError> {
        Ok(HealthStatus::Healthy)
    }
}
