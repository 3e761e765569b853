//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid, key sizes)
//! - Check TLS cipher suite names against the allow-list
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FixtureConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::FixtureConfig;
use crate::net::tls::suite_for_name;

/// RSA modulus sizes the issuer accepts.
pub const SUPPORTED_KEY_BITS: [usize; 3] = [2048, 3072, 4096];

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("unsupported RSA key size {0} (expected 2048, 3072 or 4096)")]
    KeyBits(usize),

    #[error("unknown cipher suite '{0}'")]
    CipherSuite(String),

    #[error("tls.cipher_suites must name at least one suite")]
    NoCipherSuites,
}

/// Validate a loaded configuration, collecting every problem found.
pub fn validate_config(config: &FixtureConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service.name.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "service.name" });
    }
    if config.service.container_name.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "service.container_name" });
    }
    if matches!(config.service.id.as_deref(), Some(id) if id.trim().is_empty()) {
        errors.push(ValidationError::Empty { field: "service.id" });
    }
    if config.listener.port == 0 {
        errors.push(ValidationError::Zero { field: "listener.port" });
    }

    if config.registry.enabled {
        if config.registry.host.trim().is_empty() {
            errors.push(ValidationError::Empty { field: "registry.host" });
        }
        if config.registry.port == 0 {
            errors.push(ValidationError::Zero { field: "registry.port" });
        }
    }
    if config.registry.timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "registry.timeout_secs" });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_secs" });
    }

    if config.tls.enabled {
        if !SUPPORTED_KEY_BITS.contains(&config.tls.key_bits) {
            errors.push(ValidationError::KeyBits(config.tls.key_bits));
        }
        if config.tls.cipher_suites.is_empty() {
            errors.push(ValidationError::NoCipherSuites);
        }
        for name in &config.tls.cipher_suites {
            if suite_for_name(name).is_none() {
                errors.push(ValidationError::CipherSuite(name.clone()));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
