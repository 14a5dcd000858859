//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ring size > 0, ports non-zero)
//! - Check the bind address parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::BalancerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("listener.max_connections must be greater than 0")]
    MaxConnections,

    #[error("strategy.ring_size must be greater than 0")]
    RingSize,

    #[error("backends[{0}]: host is empty")]
    EmptyHost(usize),

    #[error("backends[{0}]: port must be non-zero")]
    ZeroPort(usize),
}

/// Check a configuration, collecting every error.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::MaxConnections);
    }
    if config.strategy.ring_size == 0 {
        errors.push(ValidationError::RingSize);
    }
    for (i, backend) in config.backends.iter().enumerate() {
        if backend.host.trim().is_empty() {
            errors.push(ValidationError::EmptyHost(i));
        }
        if backend.port == 0 {
            errors.push(ValidationError::ZeroPort(i));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
