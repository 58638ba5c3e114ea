//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and address formats
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

/// One semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidBindAddress(String),
    InvalidMetricsAddress(String),
    ZeroBodyLimit,
    ZeroRequestTimeout,
    NoFormatsEnabled,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidBindAddress(addr) => {
                write!(f, "invalid bind address `{}`", addr)
            }
            ValidationError::InvalidMetricsAddress(addr) => {
                write!(f, "invalid metrics address `{}`", addr)
            }
            ValidationError::ZeroBodyLimit => write!(f, "max_body_bytes must be greater than 0"),
            ValidationError::ZeroRequestTimeout => {
                write!(f, "request_timeout_secs must be greater than 0")
            }
            ValidationError::NoFormatsEnabled => {
                write!(f, "at least one response format must be enabled")
            }
        }
    }
}

/// Validate a configuration, collecting every problem.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if config.limits.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if !config.features.json && !config.features.plain_text {
        errors.push(ValidationError::NoFormatsEnabled);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
