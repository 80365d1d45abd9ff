// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Random bit and basis choices for a protocol run.

use std::fmt;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::{Error, Result, ValidationError};

/// Encoding/measurement basis.
///
/// Bit value 0 is the diagonal (Hadamard) basis and 1 the rectilinear
/// (computational) basis. Only equality between Alice's and Bob's bases
/// matters for sifting, but preparation and measurement must agree on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Basis {
    Diagonal,
    Rectilinear,
}

impl Basis {
    pub fn from_bit(bit: u8) -> Option<Self> {
        match bit {
            0 => Some(Basis::Diagonal),
            1 => Some(Basis::Rectilinear),
            _ => None,
        }
    }

    pub fn bit(self) -> u8 {
        match self {
            Basis::Diagonal => 0,
            Basis::Rectilinear => 1,
        }
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Basis::Diagonal => write!(f, "diagonal"),
            Basis::Rectilinear => write!(f, "rectilinear"),
        }
    }
}

/// The three independent sequences drawn for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolChoices {
    /// Alice's raw key bits (0/1)
    pub alice_bits: Vec<u8>,
    /// Alice's preparation bases
    pub alice_bases: Vec<Basis>,
    /// Bob's measurement bases
    pub bob_bases: Vec<Basis>,
}

impl ProtocolChoices {
    /// Build choices from raw 0/1 sequences.
    pub fn from_bits(alice_bits: &[u8], alice_bases: &[u8], bob_bases: &[u8]) -> Result<Self> {
        if alice_bases.len() != alice_bits.len() || bob_bases.len() != alice_bits.len() {
            return Err(ValidationError::Field {
                field: "choices".into(),
                message: format!(
                    "sequence lengths differ: alice_bits={}, alice_bases={}, bob_bases={}",
                    alice_bits.len(),
                    alice_bases.len(),
                    bob_bases.len()
                ),
            }
            .into());
        }

        if let Some(i) = alice_bits.iter().position(|&b| b > 1) {
            return Err(ValidationError::Field {
                field: "alice_bits".into(),
                message: format!("value {} at index {} is not a bit", alice_bits[i], i),
            }
            .into());
        }

        Ok(Self {
            alice_bits: alice_bits.to_vec(),
            alice_bases: to_bases("alice_bases", alice_bases)?,
            bob_bases: to_bases("bob_bases", bob_bases)?,
        })
    }

    pub fn len(&self) -> usize {
        self.alice_bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alice_bits.is_empty()
    }
}

fn to_bases(field: &str, bits: &[u8]) -> Result<Vec<Basis>> {
    bits.iter()
        .enumerate()
        .map(|(i, &b)| {
            Basis::from_bit(b).ok_or_else(|| {
                Error::from(ValidationError::Field {
                    field: field.into(),
                    message: format!("value {} at index {} is not a bit", b, i),
                })
            })
        })
        .collect()
}

/// Strategy producing the per-run choice sequences.
///
/// Swapping the source is how tests pin a run to known sequences.
pub trait ChoiceSource: Send + Sync {
    /// Draw `n` positions.
    fn draw(&self, n: usize) -> Result<ProtocolChoices>;
}

/// Uniform, independent choices.
///
/// Without a seed every draw uses the thread-local generator, so concurrent
/// runs never contend. A seeded source serializes draws through one `StdRng`.
pub struct RandomChoices {
    seeded: Option<Mutex<StdRng>>,
}

impl RandomChoices {
    pub fn new() -> Self {
        Self { seeded: None }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            seeded: Some(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    fn draw_with<R: Rng + ?Sized>(rng: &mut R, n: usize) -> ProtocolChoices {
        let alice_bits = (0..n).map(|_| rng.gen_range(0..=1u8)).collect();
        let alice_bases = (0..n).map(|_| random_basis(&mut *rng)).collect();
        let bob_bases = (0..n).map(|_| random_basis(&mut *rng)).collect();
        ProtocolChoices {
            alice_bits,
            alice_bases,
            bob_bases,
        }
    }
}

impl Default for RandomChoices {
    fn default() -> Self {
        Self::new()
    }
}

fn random_basis<R: Rng + ?Sized>(rng: &mut R) -> Basis {
    if rng.gen_bool(0.5) {
        Basis::Rectilinear
    } else {
        Basis::Diagonal
    }
}

impl ChoiceSource for RandomChoices {
    fn draw(&self, n: usize) -> Result<ProtocolChoices> {
        Ok(match &self.seeded {
            Some(rng) => Self::draw_with(&mut *rng.lock(), n),
            None => Self::draw_with(&mut rand::thread_rng(), n),
        })
    }
}

/// Always returns the same sequences.
pub struct FixedChoices {
    choices: ProtocolChoices,
}

impl FixedChoices {
    pub fn new(choices: ProtocolChoices) -> Self {
        Self { choices }
    }

    pub fn from_bits(alice_bits: &[u8], alice_bases: &[u8], bob_bases: &[u8]) -> Result<Self> {
        Ok(Self::new(ProtocolChoices::from_bits(
            alice_bits,
            alice_bases,
            bob_bases,
        )?))
    }
}

impl ChoiceSource for FixedChoices {
    fn draw(&self, n: usize) -> Result<ProtocolChoices> {
        if n != self.choices.len() {
            return Err(ValidationError::Field {
                field: "key_length".into(),
                message: format!(
                    "fixed choices hold {} positions, {} requested",
                    self.choices.len(),
                    n
                ),
            }
            .into());
        }
        Ok(self.choices.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basis_bit_mapping() {
        assert_eq!(Basis::from_bit(0), Some(Basis::Diagonal));
        assert_eq!(Basis::from_bit(1), Some(Basis::Rectilinear));
        assert_eq!(Basis::from_bit(2), None);
        assert_eq!(Basis::Diagonal.bit(), 0);
        assert_eq!(Basis::Rectilinear.bit(), 1);
    }

    #[test]
    fn test_from_bits_rejects_bad_input() {
        assert!(ProtocolChoices::from_bits(&[0, 1], &[0], &[0, 1]).is_err());
        assert!(ProtocolChoices::from_bits(&[0, 2], &[0, 1], &[0, 1]).is_err());
        assert!(ProtocolChoices::from_bits(&[0, 1], &[0, 3], &[0, 1]).is_err());
        assert!(ProtocolChoices::from_bits(&[0, 1], &[0, 1], &[0, 1]).is_ok());
    }

    #[test]
    fn test_random_draw_has_requested_length() {
        let choices = RandomChoices::new().draw(257).unwrap();
        assert_eq!(choices.alice_bits.len(), 257);
        assert_eq!(choices.alice_bases.len(), 257);
        assert_eq!(choices.bob_bases.len(), 257);
        assert!(choices.alice_bits.iter().all(|&b| b <= 1));

        assert!(RandomChoices::new().draw(0).unwrap().is_empty());
    }

    #[test]
    fn test_seeded_sources_repeat() {
        let a = RandomChoices::seeded(5).draw(128).unwrap();
        let b = RandomChoices::seeded(5).draw(128).unwrap();
        let c = RandomChoices::seeded(6).draw(128).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_random_choices_are_roughly_uniform() {
        let choices = RandomChoices::seeded(2024).draw(20_000).unwrap();
        let ones = choices.alice_bits.iter().filter(|&&b| b == 1).count();
        let diag = choices
            .bob_bases
            .iter()
            .filter(|&&b| b == Basis::Diagonal)
            .count();
        assert!((ones as f64 / 20_000.0 - 0.5).abs() < 0.02);
        assert!((diag as f64 / 20_000.0 - 0.5).abs() < 0.02);
    }

    #[test]
    fn test_fixed_choices_length_must_match() {
        let fixed = FixedChoices::from_bits(&[1, 0], &[1, 0], &[1, 1]).unwrap();
        assert_eq!(fixed.draw(2).unwrap().alice_bits, vec![1, 0]);
        assert!(fixed.draw(3).is_err());
    }
}
