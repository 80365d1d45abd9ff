// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Quantum execution backends.
//!
//! This module provides the [`QuantumBackend`] trait, the
//! [`BackendRegistry`] that owns backend instances for the lifetime of the
//! process, and the in-process state-vector simulator:
//!
//! - `simulator::LocalSimulator`: single-qubit state-vector simulator

pub mod registry;
pub mod simulator;
pub mod r#trait;

pub use r#trait::{
    BackendInfo, BackendType, BatchResult, ExecuteBatchRequest, Gate, HealthStatus,
    QuantumBackend, QubitCircuit, TaskResult,
};
pub use registry::BackendRegistry;
pub use simulator::LocalSimulator;
