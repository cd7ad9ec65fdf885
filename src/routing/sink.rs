//! Weak callback handles given to collaborators.
//!
//! The transport receives a [`ResponseSink`] per request and an authoriser
//! receives an [`AuthorisationSink`] per authorisation. Both point back at
//! the router without owning it; once the router is dropped every call is
//! a no-op.

use axum::body::Bytes;
use std::sync::{Arc, Weak};

use crate::http::{AuthorisationError, Request, Response};
use crate::routing::router::Router;

/// Event-intake surface handed to the transport.
#[derive(Clone)]
pub struct ResponseSink {
    router: Weak<Router>,
}

impl ResponseSink {
    pub(crate) fn new(router: Weak<Router>) -> Self {
        Self { router }
    }

    pub fn successful_response(&self, response: Response) {
        if let Some(router) = self.router.upgrade() {
            router.successful_response(response);
        }
    }

    pub fn failed_response(&self, response: Response) {
        if let Some(router) = self.router.upgrade() {
            router.failed_response(response);
        }
    }

    pub fn cancelled_request(&self, request: Arc<Request>) {
        if let Some(router) = self.router.upgrade() {
            router.cancelled_request(request);
        }
    }

    pub fn received_data_chunk(&self, data: Bytes, response: &Response) {
        if let Some(router) = self.router.upgrade() {
            router.received_data_chunk(data, response);
        }
    }

    pub fn received_initial_response(&self, response: &Response) {
        if let Some(router) = self.router.upgrade() {
            router.received_initial_response(response);
        }
    }

    /// Whether any authoriser claims `request`. False once the router is gone.
    pub fn should_authorise_request(&self, request: &Request) -> bool {
        self.router
            .upgrade()
            .is_some_and(|router| router.should_authorise_request(request))
    }

    pub fn authorise_request(&self, request: Arc<Request>) {
        if let Some(router) = self.router.upgrade() {
            router.authorise_request(request);
        }
    }

    /// Whether the router still has an owner waiting for `request`.
    pub fn is_tracked(&self, request: &Request) -> bool {
        self.router
            .upgrade()
            .is_some_and(|router| router.is_tracking(request.id()))
    }
}

impl std::fmt::Debug for ResponseSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseSink")
            .field("router_alive", &(self.router.strong_count() > 0))
            .finish()
    }
}

/// Completion callbacks handed to an authoriser.
#[derive(Clone)]
pub struct AuthorisationSink {
    router: Weak<Router>,
}

impl AuthorisationSink {
    pub(crate) fn new(router: Weak<Router>) -> Self {
        Self { router }
    }

    /// Credentials are attached; the request may now be performed.
    pub fn authorised_request(&self, request: Arc<Request>) {
        if let Some(router) = self.router.upgrade() {
            router.authoriser_authorised_request(request);
        }
    }

    pub fn failed_to_authorise_request(&self, request: Arc<Request>, error: AuthorisationError) {
        if let Some(router) = self.router.upgrade() {
            router.authoriser_failed_to_authorise_request(request, error);
        }
    }
}

impl std::fmt::Debug for AuthorisationSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorisationSink")
            .field("router_alive", &(self.router.strong_count() > 0))
            .finish()
    }
}
