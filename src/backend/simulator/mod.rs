// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-process state-vector simulator backend.
//!
//! Each circuit acts on a fresh qubit in |0⟩. Gates are applied as 2x2
//! unitaries to the state vector and the final computational-basis
//! measurement is sampled with the Born rule, once per shot. The simulator
//! is noiseless.
//!
//! # Execution
//!
//! - Batches run on the blocking thread pool under a timeout
//! - With a seed, all batches draw from one shared `StdRng`, so a fixed
//!   sequence of batches reproduces the same outcomes

mod state;

pub use state::{gate_matrix, QubitState};

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use super::r#trait::{
    BackendInfo, BackendType, BatchResult, ExecuteBatchRequest, Gate, HealthStatus,
    QuantumBackend, QubitCircuit, TaskResult,
};
use crate::config::LocalSimulatorConfig;
use crate::error::BackendError;
use crate::validation::validate_batch;

/// Registry name of the simulator.
pub const LOCAL_SIMULATOR_NAME: &str = "local_simulator";

/// Noiseless single-qubit simulator.
pub struct LocalSimulator {
    name: String,
    rng: Option<Arc<Mutex<StdRng>>>,
    timeout: Duration,
    max_batch_size: usize,
}

impl LocalSimulator {
    /// Create a simulator from configuration.
    pub fn new(config: &LocalSimulatorConfig) -> Result<Self, BackendError> {
        if !config.enabled {
            return Err(BackendError::Unavailable(
                "local simulator is disabled in configuration".to_string(),
            ));
        }
        if config.max_batch_size == 0 {
            return Err(BackendError::Unavailable(
                "local simulator max_batch_size must be positive".to_string(),
            ));
        }

        info!(
            seeded = config.seed.is_some(),
            max_batch_size = config.max_batch_size,
            "Initializing local simulator"
        );

        Ok(Self {
            name: LOCAL_SIMULATOR_NAME.to_string(),
            rng: config
                .seed
                .map(|seed| Arc::new(Mutex::new(StdRng::seed_from_u64(seed)))),
            timeout: Duration::from_secs(config.timeout_sec),
            max_batch_size: config.max_batch_size,
        })
    }

    /// Create with default configuration.
    pub fn new_default() -> Result<Self, BackendError> {
        Self::new(&LocalSimulatorConfig::default())
    }

    /// Set execution timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Run every circuit for `shots` shots, keeping submission order.
fn run_circuits<R: Rng + ?Sized>(circuits: &[QubitCircuit], shots: u32, rng: &mut R) -> BatchResult {
    let results = circuits
        .iter()
        .map(|circuit| {
            let mut state = QubitState::zero();
            for &gate in &circuit.ops {
                state.apply(gate);
            }

            let mut counts: HashMap<String, u32> = HashMap::new();
            for _ in 0..shots {
                let bit = state.measure(rng);
                *counts.entry(bit.to_string()).or_insert(0) += 1;
            }

            TaskResult { counts, shots }
        })
        .collect();

    BatchResult { results }
}

#[async_trait]
impl QuantumBackend for LocalSimulator {
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
        debug!(
            batch_id = %request.batch_id,
            circuits = request.circuits.len(),
            shots = request.shots,
            "Executing batch on local simulator"
        );

        validate_batch(&request, self.max_batch_size)
            .map_err(|e| BackendError::InvalidRequest(e.to_string()))?;

        let rng = self.rng.clone();
        let timeout = self.timeout;
        let ExecuteBatchRequest {
            batch_id,
            circuits,
            shots,
        } = request;

        let result = tokio::time::timeout(
            timeout,
            tokio::task::spawn_blocking(move || match rng {
                Some(shared) => run_circuits(&circuits, shots, &mut *shared.lock()),
                None => run_circuits(&circuits, shots, &mut rand::thread_rng()),
            }),
        )
        .await;

        match result {
            Ok(Ok(batch)) => {
                debug!(batch_id = %batch_id, results = batch.results.len(), "Batch completed");
                Ok(batch)
            }
            Ok(Err(join_error)) => Err(BackendError::ExecutionFailed(format!(
                "Task join error: {}",
                join_error
            ))),
            Err(_elapsed) => {
                error!(
                    batch_id = %batch_id,
                    timeout_secs = timeout.as_secs(),
                    "Simulator batch timed out"
                );
                Err(BackendError::Timeout(format!(
                    "batch {} did not finish within {} seconds",
                    batch_id,
                    timeout.as_secs()
                )))
            }
        }
    }

    async fn get_backend_info(&self) -> Result<BackendInfo, BackendError> {
        Ok(BackendInfo {
            name: self.name.clone(),
            backend_type: BackendType::Simulator,
            supported_gates: vec![Gate::X, Gate::H],
            max_batch_size: self.max_batch_size,
            seeded: self.rng.is_some(),
            software_version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    async fn health_check(&self) -> Result<HealthStatus, BackendError> {
        Ok(HealthStatus::Healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(circuits: Vec<QubitCircuit>, shots: u32) -> ExecuteBatchRequest {
        ExecuteBatchRequest {
            batch_id: "test".to_string(),
            circuits,
            shots,
        }
    }

    fn seeded(seed: u64) -> LocalSimulator {
        LocalSimulator::new(&LocalSimulatorConfig {
            seed: Some(seed),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_disabled_simulator_is_unavailable() {
        let config = LocalSimulatorConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(matches!(
            LocalSimulator::new(&config),
            Err(BackendError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_results_follow_submission_order() {
        let sim = LocalSimulator::new_default().unwrap();
        let circuits = vec![
            QubitCircuit::new(),
            QubitCircuit::new().x(),
            QubitCircuit::new().x(),
            QubitCircuit::new(),
        ];
        let batch = sim.execute_batch(request(circuits, 1)).await.unwrap();

        let bits: Vec<&str> = batch
            .results
            .iter()
            .map(|r| r.counts.keys().next().unwrap().as_str())
            .collect();
        assert_eq!(bits, vec!["0", "1", "1", "0"]);
        assert!(batch.results.iter().all(|r| r.shots == 1));
    }

    #[tokio::test]
    async fn test_shot_counts_sum_to_shots() {
        let sim = seeded(3);
        let batch = sim
            .execute_batch(request(vec![QubitCircuit::new().h()], 1000))
            .await
            .unwrap();
        let counts = &batch.results[0].counts;
        assert_eq!(counts.values().sum::<u32>(), 1000);
        assert!(counts.contains_key("0") && counts.contains_key("1"));
    }

    #[tokio::test]
    async fn test_seeded_simulators_agree() {
        let circuits: Vec<QubitCircuit> = (0..64).map(|_| QubitCircuit::new().h()).collect();
        let a = seeded(99)
            .execute_batch(request(circuits.clone(), 1))
            .await
            .unwrap();
        let b = seeded(99).execute_batch(request(circuits, 1)).await.unwrap();
        assert_eq!(a.results, b.results);
    }

    #[tokio::test]
    async fn test_rejects_invalid_batches() {
        let sim = LocalSimulator::new(&LocalSimulatorConfig {
            max_batch_size: 2,
            ..Default::default()
        })
        .unwrap();

        let too_many = vec![QubitCircuit::new(); 3];
        assert!(matches!(
            sim.execute_batch(request(too_many, 1)).await,
            Err(BackendError::InvalidRequest(_))
        ));
        assert!(matches!(
            sim.execute_batch(request(vec![QubitCircuit::new()], 0)).await,
            Err(BackendError::InvalidRequest(_))
        ));
        assert!(matches!(
            sim.execute_batch(request(Vec::new(), 1)).await,
            Err(BackendError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_exceeding_timeout_fails() {
        let sim = LocalSimulator::new_default()
            .unwrap()
            .with_timeout(Duration::ZERO);
        let circuits = vec![QubitCircuit::new().h(); 4096];

        let err = sim.execute_batch(request(circuits, 200)).await.unwrap_err();
        assert!(matches!(err, BackendError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_backend_info() {
        let info = seeded(1).get_backend_info().await.unwrap();
        assert_eq!(info.name, LOCAL_SIMULATOR_NAME);
        assert_eq!(info.backend_type, BackendType::Simulator);
        assert!(info.seeded);
        assert_eq!(info.supported_gates, vec![Gate::X, Gate::H]);
    }
}
