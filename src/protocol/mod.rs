// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! BB84 key generation.
//!
//! A run draws Alice's bits and both parties' bases, prepares one qubit
//! circuit per position, submits them as a single one-shot batch to the
//! execution backend, and keeps Alice's bits wherever the bases agree.
//!
//! ```text
//! Initializing ──► Executing ──► Completed
//!      │               │
//!      └───────────────┴──────► Failed
//! ```
//!
//! A run either returns a complete [`KeyRecord`] or an error; nothing is
//! retried and nothing is persisted here. Dropping the future of
//! [`Bb84Simulator::generate_key`] abandons the run without producing a record.

mod choices;
mod record;
mod sifting;

pub use choices::{Basis, ChoiceSource, FixedChoices, ProtocolChoices, RandomChoices};
pub use record::{to_unix_seconds, unix_seconds, KeyRecord};
pub use sifting::{
    build_tasks, extract_outcomes, observed_error_rate, sift, QubitTask, SiftedKey,
};

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::backend::{ExecuteBatchRequest, QuantumBackend};
use crate::config::{MeasurementMode, ProtocolConfig};
use crate::error::{Error, ExecutionError, Result};
use crate::validation::validate_key_length;

/// Every BB84 task is measured exactly once.
pub const SHOTS_PER_TASK: u32 = 1;

/// Source of record timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Initializing,
    Executing,
    Completed,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Initializing => "initializing",
            RunState::Executing => "executing",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Everything a run observed, for diagnostics and tests.
#[derive(Debug, Clone)]
pub struct ProtocolRun {
    pub choices: ProtocolChoices,
    /// Bob's measured bits, one per position
    pub outcomes: Vec<u8>,
    pub sifted: SiftedKey,
    /// Disagreement between Bob's outcomes and Alice's bits on matching
    /// positions. Zero for a noiseless backend in [`MeasurementMode::BobBasis`].
    pub observed_error_rate: Option<f64>,
    pub record: KeyRecord,
}

/// BB84 protocol driver bound to one execution backend.
///
/// Holds no per-run state; concurrent runs on a shared instance are
/// independent.
#[derive(Clone)]
pub struct Bb84Simulator {
    backend: Arc<dyn QuantumBackend>,
    choices: Arc<dyn ChoiceSource>,
    protocol: ProtocolConfig,
    clock: Clock,
}

impl Bb84Simulator {
    /// Create a simulator using the configured seed (fresh randomness when
    /// no seed is set).
    pub fn new(backend: Arc<dyn QuantumBackend>, protocol: &ProtocolConfig) -> Self {
        let choices: Arc<dyn ChoiceSource> = match protocol.seed {
            Some(seed) => Arc::new(RandomChoices::seeded(seed)),
            None => Arc::new(RandomChoices::new()),
        };
        Self {
            backend,
            choices,
            protocol: protocol.clone(),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the choice source.
    pub fn with_choice_source(mut self, choices: Arc<dyn ChoiceSource>) -> Self {
        self.choices = choices;
        self
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn measurement_mode(&self) -> MeasurementMode {
        self.protocol.measurement
    }

    pub fn default_key_length(&self) -> usize {
        self.protocol.default_key_length
    }

    /// Run the protocol and return the key record.
    pub async fn generate_key(&self, key_length: usize) -> Result<KeyRecord> {
        Ok(self.run(key_length).await?.record)
    }

    /// Run the protocol and keep the intermediate sequences.
    pub async fn run(&self, key_length: usize) -> Result<ProtocolRun> {
        validate_key_length(key_length, &self.protocol)?;

        let run_id = Uuid::new_v4();
        let span = info_span!(
            "bb84_run",
            run_id = %run_id,
            key_length,
            backend = %self.backend.name(),
        );

        async move {
            match self.execute(run_id, key_length).await {
                Ok(run) => {
                    info!(
                        state = %RunState::Completed,
                        key_length = run.record.length(),
                        matching_bases = run.record.matching_bases_count(),
                        total_bits = run.record.total_bits_sent(),
                        observed_error_rate = ?run.observed_error_rate,
                        "Key generated"
                    );
                    Ok(run)
                }
                Err(e) => {
                    warn!(state = %RunState::Failed, error = %e, "Key generation failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, run_id: Uuid, key_length: usize) -> Result<ProtocolRun> {
        debug!(state = %RunState::Initializing, "Drawing choices");
        let choices = self.choices.draw(key_length)?;
        if choices.len() != key_length {
            return Err(Error::Config(format!(
                "choice source returned {} positions for a {}-bit run",
                choices.len(),
                key_length
            )));
        }

        let outcomes = if key_length == 0 {
            Vec::new()
        } else {
            let mode = self.measurement_mode();
            let circuits = build_tasks(&choices)
                .iter()
                .map(|task| task.circuit(mode))
                .collect();
            let request = ExecuteBatchRequest {
                batch_id: run_id.to_string(),
                circuits,
                shots: SHOTS_PER_TASK,
            };

            debug!(state = %RunState::Executing, tasks = key_length, "Submitting batch");
            let batch = self
                .backend
                .execute_batch(request)
                .await
                .map_err(ExecutionError::new)?;
            extract_outcomes(&batch, key_length)?
        };

        let sifted = sift(&choices);
        let observed_error_rate = observed_error_rate(&choices, &sifted, &outcomes);
        let record = KeyRecord::assemble(&sifted.bits, key_length, (self.clock)());

        Ok(ProtocolRun {
            choices,
            outcomes,
            sifted,
            observed_error_rate,
            record,
        })
    }
}
