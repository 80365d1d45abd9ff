// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! BB84 quantum key distribution service.
//!
//! This crate simulates the BB84 protocol on a pluggable quantum execution
//! backend and exposes key generation over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             REST Service (axum)          │
//! ├──────────────────┬──────────────────────┤
//! │  Bb84Simulator   │   KeyStore (JSON)    │
//! ├──────────────────┴──────────────────────┤
//! │           Backend Registry               │
//! ├─────────────────────────────────────────┤
//! │   Local state-vector simulator           │
//! │   (ndarray + num-complex)                │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`protocol`]: BB84 choices, sifting and key records
//! - [`backend`]: Quantum backend trait and implementations
//! - [`storage`]: Latest-key persistence
//! - [`server`]: REST server implementation
//! - [`validation`]: Input validation utilities
//! - [`error`]: Error types

pub mod backend;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod validation;

pub use config::Config;
pub use error::{Error, Result};
pub use protocol::{Bb84Simulator, KeyRecord};

#[cfg(test)]
pub mod test_utils;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
