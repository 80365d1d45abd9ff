// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Single-qubit pure state and the unitaries the simulator understands.

use std::f64::consts::FRAC_1_SQRT_2;

use ndarray::{arr1, arr2, Array1, Array2};
use num_complex::Complex64;
use rand::Rng;

use crate::backend::Gate;

/// Probabilities closer than this to 0 or 1 are treated as exact.
const PROBABILITY_EPSILON: f64 = 1e-12;

/// Unitary matrix of a gate in the computational basis.
pub fn gate_matrix(gate: Gate) -> Array2<Complex64> {
    let zero = Complex64::new(0.0, 0.0);
    let one = Complex64::new(1.0, 0.0);
    let h = Complex64::new(FRAC_1_SQRT_2, 0.0);

    match gate {
        Gate::X => arr2(&[[zero, one], [one, zero]]),
        Gate::H => arr2(&[[h, h], [h, -h]]),
    }
}

/// State vector of one qubit.
#[derive(Debug, Clone)]
pub struct QubitState {
    amplitudes: Array1<Complex64>,
}

impl QubitState {
    /// |0⟩
    pub fn zero() -> Self {
        Self {
            amplitudes: arr1(&[Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)]),
        }
    }

    pub fn apply(&mut self, gate: Gate) {
        self.amplitudes = gate_matrix(gate).dot(&self.amplitudes);
    }

    pub fn amplitudes(&self) -> &Array1<Complex64> {
        &self.amplitudes
    }

    /// Born-rule probability of reading 1 in the computational basis.
    pub fn probability_of_one(&self) -> f64 {
        let p = self.amplitudes[1].norm_sqr();
        if p < PROBABILITY_EPSILON {
            0.0
        } else if p > 1.0 - PROBABILITY_EPSILON {
            1.0
        } else {
            p
        }
    }

    /// Sample one computational-basis measurement.
    pub fn measure<R: Rng + ?Sized>(&self, rng: &mut R) -> u8 {
        let p = self.probability_of_one();
        if p == 0.0 {
            0
        } else if p == 1.0 {
            1
        } else {
            u8::from(rng.gen_bool(p))
        }
    }
}
