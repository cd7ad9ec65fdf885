//! Load and authorisation error definitions.

use std::time::Duration;
use thiserror::Error;

use crate::http::UNAUTHORISED_STATUS;

/// Why a request did not complete successfully.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The server answered with a non-success status.
    #[error("HTTP status {status}")]
    Http { status: u16 },

    /// The transport could not complete the exchange.
    #[error("Transport error: {0}")]
    Transport(String),

    /// No response arrived before the request deadline.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The request was restricted to the cache and nothing was cached.
    #[error("Resource not cached and network loading is disabled")]
    NotCached,

    /// Credentials could not be attached to the request.
    #[error("Authorisation failed: {0}")]
    Authorisation(#[from] AuthorisationError),
}

impl LoadError {
    /// HTTP status carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            LoadError::Http { status } => Some(*status),
            _ => None,
        }
    }

    /// True when the status indicates missing or invalid credentials.
    pub fn is_unauthorised(&self) -> bool {
        self.status_code() == Some(UNAUTHORISED_STATUS)
    }
}

/// Failure reported by an authoriser while acquiring credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorisationError {
    /// The authoriser has no usable credentials left.
    #[error("No credentials available for {0}")]
    NoCredentials(String),

    /// Credential acquisition failed.
    #[error("Credential provider error: {0}")]
    Provider(String),
}
