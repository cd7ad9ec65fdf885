//! Hyper-backed upstream executor.
//!
//! # Responsibilities
//! - Ask the router whether a request must be authorised before it runs
//! - Execute requests with the hyper-util connection-pooling client
//! - Report initial response, chunks and a terminal event per execution
//! - Abort in-flight exchanges on cancellation
//!
//! # Design Decisions
//! - 2xx and 3xx are successes; every other status is `LoadError::Http`
//! - Only successes produce partial events; an error body (such as the 401
//!   that starts an authorisation retry) is buffered into the failure
//! - Chunked requests stream frames as they arrive and carry no final body
//! - An exchange never outlives its request timeout; the router's watchdog
//!   reports the timeout, the transport only stops working on it
//! - Plain HTTP only; TLS termination is out of scope for this executor

use axum::body::{Body, Bytes};
use axum::http::header::{HeaderValue, USER_AGENT};
use dashmap::DashMap;
use futures_util::StreamExt;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioTimer},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::config::TransportConfig;
use crate::http::{AuthorisationError, CachePolicy, LoadError, Request, RequestId, Response};
use crate::routing::ResponseSink;
use crate::transport::executor::{AuthorisationObserver, CancelHandle, Upstream};

const DEFAULT_USER_AGENT: &str = concat!("fetch-mediator/", env!("CARGO_PKG_VERSION"));

/// Executes requests over HTTP/1.1 and HTTP/2 with hyper.
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
    user_agent: HeaderValue,
    runtime: Handle,
    tasks: Arc<DashMap<RequestId, AbortHandle>>,
}

impl HyperTransport {
    /// Create a transport spawning its exchanges on `runtime`.
    pub fn new(config: &TransportConfig, runtime: Handle) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_millis(config.connect_timeout_ms)));

        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .build(connector);

        let user_agent = HeaderValue::from_str(&config.user_agent).unwrap_or_else(|_| {
            tracing::warn!(user_agent = %config.user_agent, "Invalid user agent, using default");
            HeaderValue::from_static(DEFAULT_USER_AGENT)
        });

        Self {
            client,
            user_agent,
            runtime,
            tasks: Arc::new(DashMap::new()),
        }
    }

    /// Number of exchanges currently running.
    pub fn active_exchanges(&self) -> usize {
        self.tasks.iter().filter(|task| !task.value().is_finished()).count()
    }

    fn execute(&self, request: Arc<Request>, sink: ResponseSink) {
        if request.cache_policy() == CachePolicy::ReturnCacheDataDontLoad {
            tracing::debug!(request_id = %request.id(), "Cache-only request and no cache available");
            sink.failed_response(Response::failed(request, LoadError::NotCached));
            return;
        }

        self.tasks.retain(|_, task| !task.is_finished());

        let id = request.id();
        let deadline = request.timeout();
        let exchange = exchange(self.client.clone(), self.user_agent.clone(), request, sink);
        let task = if deadline.is_zero() {
            self.runtime.spawn(exchange)
        } else {
            self.runtime.spawn(async move {
                if tokio::time::timeout(deadline, exchange).await.is_err() {
                    tracing::debug!(request_id = %id, timeout = ?deadline, "Exchange abandoned at deadline");
                }
            })
        };
        self.tasks.insert(id, task.abort_handle());
    }

    fn cancel_handle(&self, request: Arc<Request>, sink: ResponseSink) -> CancelHandle {
        let tasks = Arc::clone(&self.tasks);
        CancelHandle::new(move || {
            if let Some((_, task)) = tasks.remove(&request.id()) {
                task.abort();
            }
            tracing::debug!(request_id = %request.id(), "Request cancelled");
            sink.cancelled_request(request);
        })
    }
}

impl Upstream for HyperTransport {
    fn perform_request(&self, request: Arc<Request>, sink: ResponseSink) -> CancelHandle {
        if sink.should_authorise_request(&request) {
            tracing::debug!(request_id = %request.id(), "Authorising before execution");
            sink.authorise_request(Arc::clone(&request));
        } else {
            self.execute(Arc::clone(&request), sink.clone());
        }
        self.cancel_handle(request, sink)
    }

    fn authorisation_observer(&self) -> Option<&dyn AuthorisationObserver> {
        Some(self)
    }
}

impl AuthorisationObserver for HyperTransport {
    fn authorised_request(&self, request: Arc<Request>, sink: ResponseSink) {
        if !sink.is_tracked(&request) {
            tracing::debug!(request_id = %request.id(), "Authorised request no longer tracked, skipping");
            return;
        }
        self.execute(request, sink);
    }

    fn failed_to_authorise_request(
        &self,
        request: Arc<Request>,
        error: AuthorisationError,
        sink: ResponseSink,
    ) {
        sink.failed_response(Response::failed(request, LoadError::Authorisation(error)));
    }
}

impl Drop for HyperTransport {
    fn drop(&mut self) {
        for task in self.tasks.iter() {
            task.value().abort();
        }
    }
}

/// Run one request/response exchange and report its events.
async fn exchange(
    client: Client<HttpConnector, Body>,
    user_agent: HeaderValue,
    request: Arc<Request>,
    sink: ResponseSink,
) {
    let outbound = match outbound_request(&request, &user_agent) {
        Ok(outbound) => outbound,
        Err(e) => {
            sink.failed_response(Response::failed(request, LoadError::Transport(e.to_string())));
            return;
        }
    };

    let response = match client.request(outbound).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(request_id = %request.id(), error = %e, "Upstream exchange failed");
            sink.failed_response(Response::failed(request, LoadError::Transport(e.to_string())));
            return;
        }
    };

    let (parts, body) = response.into_parts();
    let status = parts.status;
    let succeeded = status.is_success() || status.is_redirection();
    let initial = Response::new(Arc::clone(&request), status.as_u16(), parts.headers);
    if succeeded {
        sink.received_initial_response(&initial);
    }

    let stream = succeeded && request.chunks();
    let complete = match read_body(body, &initial, &sink, stream).await {
        Ok(Some(payload)) => initial.with_body(payload),
        Ok(None) => initial,
        Err(error) => {
            sink.failed_response(initial.with_error(error));
            return;
        }
    };

    tracing::debug!(request_id = %request.id(), status = %status, "Exchange complete");

    if succeeded {
        sink.successful_response(complete);
    } else {
        sink.failed_response(complete.with_error(LoadError::Http { status: status.as_u16() }));
    }
}

/// Stream the body as chunk events, or buffer it for the terminal response.
async fn read_body(
    body: Incoming,
    response: &Response,
    sink: &ResponseSink,
    stream: bool,
) -> Result<Option<Bytes>, LoadError> {
    let mut frames = Body::new(body).into_data_stream();
    let mut buffered = Vec::new();

    while let Some(frame) = frames.next().await {
        let data = frame.map_err(|e| LoadError::Transport(e.to_string()))?;
        if stream {
            sink.received_data_chunk(data, response);
        } else {
            buffered.extend_from_slice(&data);
        }
    }

    Ok((!stream).then(|| Bytes::from(buffered)))
}

fn outbound_request(
    request: &Request,
    user_agent: &HeaderValue,
) -> Result<axum::http::Request<Body>, axum::http::Error> {
    let mut builder = axum::http::Request::builder()
        .method(request.method().clone())
        .uri(request.target().as_str());

    if let Some(headers) = builder.headers_mut() {
        headers.extend(request.headers());
        headers
            .entry(USER_AGENT)
            .or_insert_with(|| user_agent.clone());
    }

    let body = request.body().cloned().map(Body::from).unwrap_or_else(Body::empty);
    builder.body(body)
}
