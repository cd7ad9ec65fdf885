//! The request router.
//!
//! # Responsibilities
//! - Accept requests from handlers and hand them to the upstream transport
//! - Track which handler owns which in-flight request
//! - Deliver every event to its owner, terminal events at most once
//! - Drive the single authorisation retry on 401 failures
//! - Relay authoriser outcomes to the upstream observer
//!
//! # Design Decisions
//! - Built with `Arc::new_cyclic` so the router can give out weak self references
//! - Authorisers and upstream are immutable after construction
//! - Offline flag lives in a hot-swappable config snapshot
//! - Timeout races are resolved by the table: first terminal event wins

use arc_swap::ArcSwap;
use axum::body::Bytes;
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;

use crate::auth::{Authoriser, AuthoriserList};
use crate::config::MediatorConfig;
use crate::http::{AuthorisationError, CachePolicy, Request, RequestId, Response};
use crate::observability::metrics;
use crate::resilience::retries::{self, RetryDecision};
use crate::resilience::timeouts;
use crate::routing::handler::Handler;
use crate::routing::sink::{AuthorisationSink, ResponseSink};
use crate::routing::table::OwnershipTable;
use crate::transport::{CancelHandle, Upstream};

/// Errors returned by the router.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The request is already in flight.
    #[error("Request {0} is already being tracked")]
    AlreadyTracked(RequestId),

    /// The router was built outside a Tokio runtime and none was supplied.
    #[error("No Tokio runtime available for timeout scheduling")]
    NoRuntime,
}

/// Mediator between handlers, authorisers and the upstream transport.
pub struct Router {
    this: Weak<Router>,
    table: OwnershipTable,
    authorisers: AuthoriserList,
    upstream: Arc<dyn Upstream>,
    config: ArcSwap<MediatorConfig>,
    runtime: Handle,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Track `request` for `handler` and hand it to the upstream.
    ///
    /// Returns the upstream's cancellation handle unchanged.
    pub fn dispatch<H>(&self, handler: &Arc<H>, request: Arc<Request>) -> Result<CancelHandle, RouterError>
    where
        H: Handler + 'static,
    {
        let owner: Weak<H> = Arc::downgrade(handler);
        self.dispatch_weak(owner, request)
    }

    /// [`Router::dispatch`] for callers holding a type-erased handler,
    /// e.g. `Arc::downgrade(&handler)` on an `Arc<dyn Handler>`.
    pub fn dispatch_weak(&self, owner: Weak<dyn Handler>, request: Arc<Request>) -> Result<CancelHandle, RouterError> {
        let id = request.id();
        if !self.table.insert(id, owner) {
            return Err(RouterError::AlreadyTracked(id));
        }

        if self.is_offline() {
            request.set_cache_policy(CachePolicy::ReturnCacheDataDontLoad);
        }

        metrics::record_dispatched();
        metrics::record_in_flight(self.table.len());

        if request.timeout() > Duration::ZERO {
            timeouts::arm_watchdog(&self.runtime, self.this.clone(), &request);
        }

        tracing::debug!(
            request_id = %id,
            method = %request.method(),
            target = %request.target(),
            timeout = ?request.timeout(),
            cache_policy = ?request.cache_policy(),
            "Dispatching request"
        );

        Ok(self.upstream.perform_request(request, self.response_sink()))
    }

    // --- Event intake ---

    pub fn successful_response(&self, response: Response) {
        let id = response.request().id();
        match self.release(id) {
            Some(handler) => {
                tracing::debug!(request_id = %id, status = ?response.status(), "Delivering success");
                metrics::record_outcome("success");
                handler.successful_response(response);
            }
            None => self.dropped("success", id),
        }
    }

    /// Terminal failure, unless it starts the one authorisation retry.
    pub fn failed_response(&self, response: Response) {
        if let RetryDecision::Retry(authoriser) = retries::evaluate_failure(&self.authorisers, &response) {
            let request = response.request().clone();
            tracing::info!(
                request_id = %request.id(),
                authoriser = authoriser.name(),
                "Unauthorised response, retrying authorisation"
            );
            metrics::record_authorisation_retry();
            authoriser.authorise_request(request, self.authorisation_sink());
            return;
        }

        let id = response.request().id();
        match self.release(id) {
            Some(handler) => {
                tracing::debug!(
                    request_id = %id,
                    error = ?response.error(),
                    "Delivering failure"
                );
                metrics::record_outcome("failure");
                handler.failed_response(response);
            }
            None => self.dropped("failure", id),
        }
    }

    pub fn cancelled_request(&self, request: Arc<Request>) {
        let id = request.id();
        match self.release(id) {
            Some(handler) => {
                tracing::debug!(request_id = %id, "Delivering cancellation");
                metrics::record_outcome("cancelled");
                handler.cancelled_request(request);
            }
            None => self.dropped("cancellation", id),
        }
    }

    pub fn received_data_chunk(&self, data: Bytes, response: &Response) {
        let id = response.request().id();
        match self.table.get(id) {
            Some(handler) => handler.received_data_chunk(data, response),
            None => self.dropped("chunk", id),
        }
    }

    pub fn received_initial_response(&self, response: &Response) {
        let id = response.request().id();
        match self.table.get(id) {
            Some(handler) => handler.received_initial_response(response),
            None => self.dropped("initial_response", id),
        }
    }

    /// Watchdog entry point: the request deadline passed.
    pub(crate) fn request_timed_out(&self, request: Arc<Request>) {
        if self.table.contains(request.id()) {
            tracing::warn!(
                request_id = %request.id(),
                timeout = ?request.timeout(),
                "Request timed out"
            );
            metrics::record_timeout();
        }
        self.failed_response(Response::timed_out(request));
    }

    // --- Authoriser relay ---

    pub fn authoriser_authorised_request(&self, request: Arc<Request>) {
        match self.upstream.authorisation_observer() {
            Some(observer) => observer.authorised_request(request, self.response_sink()),
            None => tracing::debug!(request_id = %request.id(), "Authorised request, no observer"),
        }
    }

    pub fn authoriser_failed_to_authorise_request(&self, request: Arc<Request>, error: AuthorisationError) {
        tracing::warn!(request_id = %request.id(), error = %error, "Authoriser failed to authorise request");
        if let Some(observer) = self.upstream.authorisation_observer() {
            observer.failed_to_authorise_request(request, error, self.response_sink());
        }
    }

    // --- Authorisation helpers ---

    pub fn should_authorise_request(&self, request: &Request) -> bool {
        self.authorisers.should_authorise(request)
    }

    /// Hand `request` to the first relevant authoriser only.
    pub fn authorise_request(&self, request: Arc<Request>) {
        let authoriser: Option<Arc<dyn Authoriser>> = self.authorisers.first_relevant(&request);
        match authoriser {
            Some(authoriser) => {
                tracing::debug!(
                    request_id = %request.id(),
                    authoriser = authoriser.name(),
                    "Authorising request"
                );
                authoriser.authorise_request(request, self.authorisation_sink());
            }
            None => tracing::debug!(request_id = %request.id(), "No authoriser claims request"),
        }
    }

    // --- Configuration ---

    pub fn is_offline(&self) -> bool {
        self.config.load().offline
    }

    pub fn set_offline(&self, offline: bool) {
        self.config.rcu(|current| {
            let mut next = MediatorConfig::clone(current);
            next.offline = offline;
            next
        });
        tracing::info!(offline, "Offline mode updated");
    }

    /// Swap in a reloaded configuration. In-flight requests keep the
    /// cache policy they were dispatched with.
    pub fn reload_config(&self, config: MediatorConfig) {
        tracing::info!(offline = config.offline, "Router configuration reloaded");
        self.config.store(Arc::new(config));
    }

    pub fn config(&self) -> Arc<MediatorConfig> {
        self.config.load_full()
    }

    // --- Diagnostics ---

    /// Number of requests currently awaiting a terminal event.
    pub fn in_flight(&self) -> usize {
        self.table.len()
    }

    pub fn is_tracking(&self, id: RequestId) -> bool {
        self.table.contains(id)
    }

    pub fn authorisers(&self) -> &AuthoriserList {
        &self.authorisers
    }

    fn release(&self, id: RequestId) -> Option<Arc<dyn Handler>> {
        let handler = self.table.pop(id);
        metrics::record_in_flight(self.table.len());
        handler
    }

    fn dropped(&self, event: &'static str, id: RequestId) {
        tracing::debug!(request_id = %id, event, "No live handler for request, dropping event");
        metrics::record_dropped(event);
    }

    fn response_sink(&self) -> ResponseSink {
        ResponseSink::new(self.this.clone())
    }

    fn authorisation_sink(&self) -> AuthorisationSink {
        AuthorisationSink::new(self.this.clone())
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("in_flight", &self.table.len())
            .field("authorisers", &self.authorisers)
            .field("offline", &self.is_offline())
            .finish()
    }
}

/// Builder for [`Router`].
#[derive(Default)]
pub struct RouterBuilder {
    authorisers: Vec<Arc<dyn Authoriser>>,
    config: MediatorConfig,
    runtime: Option<Handle>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an authoriser. Earlier authorisers take precedence.
    pub fn authoriser(mut self, authoriser: Arc<dyn Authoriser>) -> Self {
        self.authorisers.push(authoriser);
        self
    }

    pub fn authorisers(mut self, authorisers: impl IntoIterator<Item = Arc<dyn Authoriser>>) -> Self {
        self.authorisers.extend(authorisers);
        self
    }

    pub fn config(mut self, config: MediatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn offline(mut self, offline: bool) -> Self {
        self.config.offline = offline;
        self
    }

    /// Runtime used for timeout watchdogs. Defaults to the current runtime.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self, upstream: Arc<dyn Upstream>) -> Result<Arc<Router>, RouterError> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| RouterError::NoRuntime)?,
        };

        let router = Arc::new_cyclic(|this| Router {
            this: this.clone(),
            table: OwnershipTable::new(),
            authorisers: AuthoriserList::new(self.authorisers),
            upstream,
            config: ArcSwap::from_pointee(self.config),
            runtime,
        });

        tracing::debug!(
            authorisers = router.authorisers.len(),
            offline = router.is_offline(),
            "Router constructed"
        );
        Ok(router)
    }
}
