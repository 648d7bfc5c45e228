//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: NodeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::NodeConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("identity.peer_id must not be empty")]
    EmptyPeerId,

    #[error("add.chunk_size must be greater than zero")]
    ZeroChunkSize,

    #[error("republisher.interval_secs must be greater than zero")]
    ZeroRepublishInterval,

    #[error("observability.log_level '{0}' is not one of trace, debug, info, warn, error")]
    UnknownLogLevel(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

pub fn validate_config(config: &NodeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.identity.peer_id.trim().is_empty() {
        errors.push(ValidationError::EmptyPeerId);
    }
    if config.add.chunk_size == 0 {
        errors.push(ValidationError::ZeroChunkSize);
    }
    if config.republisher.interval_secs == 0 {
        errors.push(ValidationError::ZeroRepublishInterval);
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::UnknownLogLevel(observability.log_level.clone()));
    }
    // Only checked when it will be used.
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&NodeConfig::default()), Ok(()));
    }

    #[test]
    fn test_all_errors_reported() {
        let mut config = NodeConfig::default();
        config.identity.peer_id = " ".into();
        config.add.chunk_size = 0;
        config.observability.log_level = "loud".into();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyPeerId,
                ValidationError::ZeroChunkSize,
                ValidationError::UnknownLogLevel("loud".into()),
                ValidationError::InvalidMetricsAddress("nowhere".into()),
            ]
        );
    }
}
