//! Response descriptor.
//!
//! # Responsibilities
//! - Reference the originating request
//! - Carry status, headers, payload and an optional error
//! - Provide the synthetic timeout response used by the watchdog

use axum::body::Bytes;
use axum::http::HeaderMap;
use std::sync::Arc;

use crate::http::error::LoadError;
use crate::http::request::Request;

/// Outcome (or partial outcome) of a request.
#[derive(Debug, Clone)]
pub struct Response {
    request: Arc<Request>,
    status: Option<u16>,
    headers: HeaderMap,
    body: Option<Bytes>,
    error: Option<LoadError>,
}

impl Response {
    /// Response with a status line and headers but no payload yet.
    pub fn new(request: Arc<Request>, status: u16, headers: HeaderMap) -> Self {
        Self {
            request,
            status: Some(status),
            headers,
            body: None,
            error: None,
        }
    }

    /// Failure with no server response, e.g. a connection error.
    pub fn failed(request: Arc<Request>, error: LoadError) -> Self {
        Self {
            request,
            status: error.status_code(),
            headers: HeaderMap::new(),
            body: None,
            error: Some(error),
        }
    }

    /// Synthetic response produced when the request deadline passes.
    pub fn timed_out(request: Arc<Request>) -> Self {
        let timeout = request.timeout();
        Self::failed(request, LoadError::Timeout(timeout))
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_error(mut self, error: LoadError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn request(&self) -> &Arc<Request> {
        &self.request
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn error(&self) -> Option<&LoadError> {
        self.error.as_ref()
    }

    /// True when the error slot indicates missing or invalid credentials.
    pub fn is_unauthorised(&self) -> bool {
        self.error.as_ref().is_some_and(LoadError::is_unauthorised)
    }
}
