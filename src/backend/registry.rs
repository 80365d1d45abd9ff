// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Backend registry.
//!
//! The registry is the execution context of the process: it is built once at
//! startup from configuration, then shared by `Arc` with every protocol run.
//! There is no global backend instance.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::{BackendType, LocalSimulator, QuantumBackend};
use crate::config::BackendsConfig;
use crate::error::{BackendError, Error, Result};

/// Named quantum backends with a default.
pub struct BackendRegistry {
    backends: RwLock<BTreeMap<String, Arc<dyn QuantumBackend>>>,
    default_backend: RwLock<Option<String>>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            backends: RwLock::new(BTreeMap::new()),
            default_backend: RwLock::new(None),
        }
    }

    /// Build a registry holding every backend enabled in configuration.
    ///
    /// Fails with an initialization error when no backend can be constructed;
    /// the service cannot do anything useful without one.
    pub fn from_config(config: &BackendsConfig) -> Result<Self> {
        let registry = Self::new();

        if config.local_simulator.enabled {
            let simulator = LocalSimulator::new(&config.local_simulator)?;
            registry.register(Arc::new(simulator));
        }

        if registry.is_empty() {
            return Err(Error::Backend(BackendError::Unavailable(
                "no quantum backend is enabled".to_string(),
            )));
        }

        Ok(registry)
    }

    /// Register a backend, replacing any backend with the same name.
    ///
    /// The first backend registered becomes the default.
    pub fn register(&self, backend: Arc<dyn QuantumBackend>) {
        let name = backend.name().to_string();
        info!(backend = %name, backend_type = %backend.backend_type(), "Registering backend");

        self.backends.write().insert(name.clone(), backend);

        let mut default = self.default_backend.write();
        if default.is_none() {
            debug!(backend = %name, "Setting as default backend");
            *default = Some(name);
        }
    }

    /// Make a registered backend the default.
    pub fn set_default(&self, name: &str) -> Result<()> {
        if !self.backends.read().contains_key(name) {
            return Err(BackendError::NotFound(name.to_string()).into());
        }
        *self.default_backend.write() = Some(name.to_string());
        info!(backend = %name, "Set as default backend");
        Ok(())
    }

    /// Get a backend by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn QuantumBackend>> {
        self.backends
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(name.to_string()).into())
    }

    /// Get the default backend.
    pub fn get_default(&self) -> Result<Arc<dyn QuantumBackend>> {
        let name = self
            .default_backend_name()
            .ok_or_else(|| BackendError::NotFound("no default backend configured".to_string()))?;
        self.get(&name)
    }

    /// Get a backend by name, or the default if name is None.
    pub fn get_or_default(&self, name: Option<&str>) -> Result<Arc<dyn QuantumBackend>> {
        match name {
            Some(n) => self.get(n),
            None => self.get_default(),
        }
    }

    /// Registered names with their types, sorted by name.
    pub fn list_with_types(&self) -> Vec<(String, BackendType)> {
        self.backends
            .read()
            .iter()
            .map(|(name, backend)| (name.clone(), backend.backend_type()))
            .collect()
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        self.backends.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.backends.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn default_backend_name(&self) -> Option<String> {
        self.default_backend.read().clone()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
