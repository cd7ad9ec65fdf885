//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MediatorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::MediatorConfig;

/// A semantic problem in an otherwise well-formed config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("transport.connect_timeout_ms must be greater than zero")]
    ZeroConnectTimeout,

    #[error("transport.user_agent is not a valid header value")]
    InvalidUserAgent,

    #[error("authoriser {0:?} has an empty host")]
    EmptyAuthoriserHost(String),

    #[error("authoriser {0:?} is defined more than once")]
    DuplicateAuthoriser(String),

    #[error("observability.log_level {0:?} is not a valid filter")]
    InvalidLogLevel(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &MediatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.transport.connect_timeout_ms == 0 {
        errors.push(ValidationError::ZeroConnectTimeout);
    }

    if axum::http::HeaderValue::from_str(&config.transport.user_agent).is_err() {
        errors.push(ValidationError::InvalidUserAgent);
    }

    let mut seen = HashSet::new();
    for authoriser in &config.authorisers {
        if authoriser.host.trim().is_empty() {
            errors.push(ValidationError::EmptyAuthoriserHost(authoriser.name.clone()));
        }
        if !seen.insert(authoriser.name.as_str()) {
            errors.push(ValidationError::DuplicateAuthoriser(authoriser.name.clone()));
        }
    }

    if EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
