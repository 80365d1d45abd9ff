// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-position qubit tasks, outcome extraction and basis sifting.

use crate::backend::{BatchResult, QubitCircuit};
use crate::config::MeasurementMode;
use crate::error::{BackendError, ExecutionError};

use super::choices::{Basis, ProtocolChoices};

/// Preparation and measurement of one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QubitTask {
    pub index: usize,
    pub bit: u8,
    pub alice_basis: Basis,
    pub bob_basis: Basis,
}

impl QubitTask {
    /// Circuit for this task.
    ///
    /// Bit 1 flips |0⟩ with X, Alice's diagonal basis adds H. In
    /// [`MeasurementMode::BobBasis`] a diagonal Bob basis adds a second H so
    /// the computational-basis readout measures in Bob's basis.
    pub fn circuit(&self, mode: MeasurementMode) -> QubitCircuit {
        let mut circuit = QubitCircuit::new();
        if self.bit == 1 {
            circuit = circuit.x();
        }
        if self.alice_basis == Basis::Diagonal {
            circuit = circuit.h();
        }
        if mode == MeasurementMode::BobBasis && self.bob_basis == Basis::Diagonal {
            circuit = circuit.h();
        }
        circuit
    }
}

/// One task per position, in order.
pub fn build_tasks(choices: &ProtocolChoices) -> Vec<QubitTask> {
    choices
        .alice_bits
        .iter()
        .zip(&choices.alice_bases)
        .zip(&choices.bob_bases)
        .enumerate()
        .map(|(index, ((&bit, &alice_basis), &bob_basis))| QubitTask {
            index,
            bit,
            alice_basis,
            bob_basis,
        })
        .collect()
}

/// Read exactly one outcome bit per task from a single-shot batch.
pub fn extract_outcomes(batch: &BatchResult, expected: usize) -> Result<Vec<u8>, ExecutionError> {
    if batch.results.len() != expected {
        return Err(BackendError::MissingOutcome {
            expected,
            received: batch.results.len(),
        }
        .into());
    }

    batch
        .results
        .iter()
        .enumerate()
        .map(|(task, result)| {
            let mut observed = result.counts.iter().filter(|(_, &n)| n > 0);
            let (bits, count) = match (observed.next(), observed.next()) {
                (Some(only), None) => only,
                (None, _) => {
                    return Err(malformed(task, "no outcome recorded".to_string()));
                }
                (Some(_), Some(_)) => {
                    return Err(malformed(task, "more than one outcome recorded".to_string()));
                }
            };
            if *count != 1 {
                return Err(malformed(
                    task,
                    format!("expected a single shot, got {} for '{}'", count, bits),
                ));
            }
            match bits.as_str() {
                "0" => Ok(0),
                "1" => Ok(1),
                other => Err(malformed(task, format!("'{}' is not a single bit", other))),
            }
        })
        .collect()
}

fn malformed(task: usize, message: String) -> ExecutionError {
    BackendError::MalformedOutcome { task, message }.into()
}

/// Result of comparing bases position by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiftedKey {
    /// `alice_bases[i] == bob_bases[i]`
    pub matching: Vec<bool>,
    /// Alice's bits at matching positions, in order
    pub bits: Vec<u8>,
}

impl SiftedKey {
    pub fn matching_count(&self) -> usize {
        self.bits.len()
    }
}

/// Keep Alice's bits where both parties chose the same basis.
pub fn sift(choices: &ProtocolChoices) -> SiftedKey {
    let matching: Vec<bool> = choices
        .alice_bases
        .iter()
        .zip(&choices.bob_bases)
        .map(|(a, b)| a == b)
        .collect();

    let bits = choices
        .alice_bits
        .iter()
        .zip(&matching)
        .filter(|(_, &keep)| keep)
        .map(|(&bit, _)| bit)
        .collect();

    SiftedKey { matching, bits }
}

/// Fraction of matching positions where Bob's outcome differs from Alice's
/// bit. `None` when no basis matched.
pub fn observed_error_rate(choices: &ProtocolChoices, sifted: &SiftedKey, outcomes: &[u8]) -> Option<f64> {
    let matched = sifted.matching_count();
    if matched == 0 {
        return None;
    }
    let errors = sifted
        .matching
        .iter()
        .zip(&choices.alice_bits)
        .zip(outcomes)
        .filter(|((&keep, &bit), &outcome)| keep && bit != outcome)
        .count();
    Some(errors as f64 / matched as f64)
}
