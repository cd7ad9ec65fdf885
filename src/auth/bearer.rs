//! Static bearer-token authoriser.
//!
//! # Responsibilities
//! - Claim requests for one host
//! - Attach `Authorization: Bearer <token>`
//! - Rotate to the next configured token when the current one is rejected
//!
//! # Design Decisions
//! - Host comparison is case-insensitive (URL hosts are lowercased on parse)
//! - A rejection only invalidates the token the request actually carried,
//!   so concurrent failures with the same stale token rotate once

use axum::http::header::{HeaderValue, AUTHORIZATION};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::auth::authoriser::Authoriser;
use crate::config::AuthoriserConfig;
use crate::http::{AuthorisationError, Request};
use crate::routing::AuthorisationSink;

#[derive(Debug)]
pub struct BearerTokenAuthoriser {
    name: String,
    host: String,
    tokens: Vec<String>,
    current: AtomicUsize,
}

impl BearerTokenAuthoriser {
    pub fn new(name: impl Into<String>, host: impl Into<String>, tokens: Vec<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into().to_lowercase(),
            tokens,
            current: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &AuthoriserConfig) -> Self {
        Self::new(config.name.clone(), config.host.clone(), config.tokens.clone())
    }

    /// Token currently handed out, if any remain.
    pub fn current_token(&self) -> Option<&str> {
        self.tokens
            .get(self.current.load(Ordering::Acquire))
            .map(String::as_str)
    }

    fn header_for(token: &str) -> Result<HeaderValue, AuthorisationError> {
        HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| AuthorisationError::Provider(e.to_string()))
    }
}

impl Authoriser for BearerTokenAuthoriser {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires_authorisation(&self, request: &Request) -> bool {
        request.host().is_some_and(|host| host == self.host)
    }

    fn authorise_request(&self, request: Arc<Request>, sink: AuthorisationSink) {
        let header = self
            .current_token()
            .ok_or_else(|| AuthorisationError::NoCredentials(self.host.clone()))
            .and_then(Self::header_for);

        match header {
            Ok(value) => {
                request.set_header(AUTHORIZATION, value);
                sink.authorised_request(request);
            }
            Err(error) => {
                tracing::warn!(authoriser = %self.name, error = %error, "Cannot authorise request");
                sink.failed_to_authorise_request(request, error);
            }
        }
    }

    fn request_failed_authorisation(&self, request: &Request) {
        let index = self.current.load(Ordering::Acquire);
        let Some(token) = self.tokens.get(index) else {
            return;
        };

        let carried = request.header(&AUTHORIZATION);
        let rejected = match Self::header_for(token) {
            Ok(expected) => carried.as_ref() == Some(&expected),
            Err(_) => true,
        };

        if rejected
            && self
                .current
                .compare_exchange(index, index + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            tracing::info!(
                authoriser = %self.name,
                remaining = self.tokens.len().saturating_sub(index + 1),
                "Token rejected, rotating"
            );
        }
    }
}
