// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Input validation for protocol runs and backend batches.

use crate::backend::ExecuteBatchRequest;
use crate::config::ProtocolConfig;
use crate::error::{Result, ValidationError};

/// Validate a requested key length against the protocol limits.
///
/// Zero is rejected unless the configuration opts into empty keys.
pub fn validate_key_length(key_length: usize, protocol: &ProtocolConfig) -> Result<()> {
    if key_length == 0 && !protocol.allow_empty_key {
        return Err(ValidationError::Field {
            field: "key_length".into(),
            message: "must be greater than 0".into(),
        }
        .into());
    }

    if key_length > protocol.max_key_length {
        return Err(ValidationError::ResourceLimit {
            resource: "key_length".into(),
            limit: protocol.max_key_length as u64,
            requested: key_length as u64,
        }
        .into());
    }

    Ok(())
}

/// Validate batch shape before it reaches a backend.
pub fn validate_batch(request: &ExecuteBatchRequest, max_batch_size: usize) -> Result<()> {
    let num_circuits = request.circuits.len();
    if num_circuits == 0 {
        return Err(ValidationError::Field {
            field: "circuits".into(),
            message: "batch cannot be empty".into(),
        }
        .into());
    }

    if num_circuits > max_batch_size {
        return Err(ValidationError::ResourceLimit {
            resource: "batch_size".into(),
            limit: max_batch_size as u64,
            requested: num_circuits as u64,
        }
        .into());
    }

    if request.shots == 0 {
        return Err(ValidationError::Field {
            field: "shots".into(),
            message: "must be greater than 0".into(),
        }
        .into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::QubitCircuit;
    use crate::error::Error;

    #[test]
    fn test_validate_key_length() {
        let protocol = ProtocolConfig::default();

        assert!(validate_key_length(1, &protocol).is_ok());
        assert!(validate_key_length(32, &protocol).is_ok());
        assert!(validate_key_length(protocol.max_key_length, &protocol).is_ok());

        assert!(matches!(
            validate_key_length(0, &protocol),
            Err(Error::Validation(ValidationError::Field { .. }))
        ));
        assert!(matches!(
            validate_key_length(protocol.max_key_length + 1, &protocol),
            Err(Error::Validation(ValidationError::ResourceLimit { .. }))
        ));
    }

    #[test]
    fn test_validate_key_length_allow_empty() {
        let protocol = ProtocolConfig {
            allow_empty_key: true,
            ..Default::default()
        };
        assert!(validate_key_length(0, &protocol).is_ok());
    }

    fn batch(num_circuits: usize, shots: u32) -> ExecuteBatchRequest {
        ExecuteBatchRequest {
            batch_id: "test".to_string(),
            circuits: vec![QubitCircuit::new().h(); num_circuits],
            shots,
        }
    }

    #[test]
    fn test_validate_batch() {
        assert!(validate_batch(&batch(10, 1), 100).is_ok());
        assert!(validate_batch(&batch(100, 1), 100).is_ok());
        assert!(validate_batch(&batch(0, 1), 100).is_err());
        assert!(matches!(
            validate_batch(&batch(101, 1), 100),
            Err(Error::Validation(ValidationError::ResourceLimit { .. }))
        ));
        assert!(validate_batch(&batch(10, 0), 100).is_err());
    }
}
