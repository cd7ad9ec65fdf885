//! Shared collaborators for integration tests.
#![allow(dead_code)]

use axum::body::Bytes;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use fetch_mediator::auth::Authoriser;
use fetch_mediator::http::{AuthorisationError, LoadError, RequestId};
use fetch_mediator::routing::{AuthorisationSink, ResponseSink};
use fetch_mediator::transport::AuthorisationObserver;
use fetch_mediator::{CancelHandle, Handler, Request, Response, Upstream};

// --- Handler ---

/// Event observed by a [`RecordingHandler`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Success(RequestId, Option<Bytes>),
    Failure(RequestId, Option<LoadError>),
    Cancelled(RequestId),
    Chunk(RequestId, Bytes),
    Initial(RequestId, Option<u16>),
}

impl Event {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Success(..) | Event::Failure(..) | Event::Cancelled(..))
    }
}

#[derive(Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<Event>>,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn terminal_events(&self) -> Vec<Event> {
        self.events().into_iter().filter(Event::is_terminal).collect()
    }

    pub fn chunks(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Chunk(_, data) => Some(data.to_vec()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl Handler for RecordingHandler {
    fn successful_response(&self, response: Response) {
        self.push(Event::Success(response.request().id(), response.body().cloned()));
    }

    fn failed_response(&self, response: Response) {
        self.push(Event::Failure(response.request().id(), response.error().cloned()));
    }

    fn cancelled_request(&self, request: Arc<Request>) {
        self.push(Event::Cancelled(request.id()));
    }

    fn received_data_chunk(&self, data: Bytes, response: &Response) {
        self.push(Event::Chunk(response.request().id(), data));
    }

    fn received_initial_response(&self, response: &Response) {
        self.push(Event::Initial(response.request().id(), response.status()));
    }
}

/// Poll `condition` until it holds or `limit` passes.
pub async fn wait_for(limit: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// --- Upstream ---

/// Upstream that records what it is asked to do and lets the test drive events.
#[derive(Default)]
pub struct ScriptedUpstream {
    observe: bool,
    performed: Mutex<Vec<(Arc<Request>, ResponseSink)>>,
    authorised: Mutex<Vec<RequestId>>,
    authorisation_failures: Mutex<Vec<(RequestId, AuthorisationError)>>,
}

impl ScriptedUpstream {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Upstream that also supports the authorisation notifications.
    pub fn observing() -> Arc<Self> {
        Arc::new(Self {
            observe: true,
            ..Self::default()
        })
    }

    pub fn performed(&self) -> Vec<Arc<Request>> {
        self.performed.lock().unwrap().iter().map(|(r, _)| r.clone()).collect()
    }

    /// Sink handed over with the most recent perform_request call.
    pub fn sink(&self) -> ResponseSink {
        self.performed.lock().unwrap().last().expect("nothing performed").1.clone()
    }

    pub fn authorised(&self) -> Vec<RequestId> {
        self.authorised.lock().unwrap().clone()
    }

    pub fn authorisation_failures(&self) -> Vec<(RequestId, AuthorisationError)> {
        self.authorisation_failures.lock().unwrap().clone()
    }
}

impl Upstream for ScriptedUpstream {
    fn perform_request(&self, request: Arc<Request>, sink: ResponseSink) -> CancelHandle {
        self.performed.lock().unwrap().push((request.clone(), sink.clone()));
        CancelHandle::new(move || sink.cancelled_request(request))
    }

    fn authorisation_observer(&self) -> Option<&dyn AuthorisationObserver> {
        if self.observe {
            Some(self)
        } else {
            None
        }
    }
}

impl AuthorisationObserver for ScriptedUpstream {
    fn authorised_request(&self, request: Arc<Request>, _sink: ResponseSink) {
        self.authorised.lock().unwrap().push(request.id());
    }

    fn failed_to_authorise_request(
        &self,
        request: Arc<Request>,
        error: AuthorisationError,
        _sink: ResponseSink,
    ) {
        self.authorisation_failures.lock().unwrap().push((request.id(), error));
    }
}

// --- Authoriser ---

/// Authoriser with a fixed relevance answer that counts its calls.
pub struct CountingAuthoriser {
    name: &'static str,
    relevant: bool,
    pub authorise_calls: AtomicUsize,
    pub failure_notifications: AtomicUsize,
    sinks: Mutex<Vec<(Arc<Request>, AuthorisationSink)>>,
}

impl CountingAuthoriser {
    pub fn new(name: &'static str, relevant: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            relevant,
            authorise_calls: AtomicUsize::new(0),
            failure_notifications: AtomicUsize::new(0),
            sinks: Mutex::new(Vec::new()),
        })
    }

    pub fn authorise_calls(&self) -> usize {
        self.authorise_calls.load(Ordering::SeqCst)
    }

    pub fn failure_notifications(&self) -> usize {
        self.failure_notifications.load(Ordering::SeqCst)
    }

    /// Complete the most recent authorisation.
    pub fn complete_last(&self) {
        let last = self.sinks.lock().unwrap().last().cloned();
        if let Some((request, sink)) = last {
            sink.authorised_request(request);
        }
    }

    pub fn fail_last(&self, error: AuthorisationError) {
        let last = self.sinks.lock().unwrap().last().cloned();
        if let Some((request, sink)) = last {
            sink.failed_to_authorise_request(request, error);
        }
    }
}

impl Authoriser for CountingAuthoriser {
    fn name(&self) -> &str {
        self.name
    }

    fn requires_authorisation(&self, _request: &Request) -> bool {
        self.relevant
    }

    fn authorise_request(&self, request: Arc<Request>, sink: AuthorisationSink) {
        self.authorise_calls.fetch_add(1, Ordering::SeqCst);
        self.sinks.lock().unwrap().push((request, sink));
    }

    fn request_failed_authorisation(&self, _request: &Request) {
        self.failure_notifications.fetch_add(1, Ordering::SeqCst);
    }
}

// --- Backend ---

/// What the mock backend saw for one request.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub authorization: Option<String>,
}

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(SeenRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(seen) = read_request_head(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(seen).await;
                        let status_text = match status {
                            200 => "200 OK",
                            401 => "401 Unauthorized",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request_head(socket: &mut tokio::net::TcpStream) -> Option<SeenRequest> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await.ok()?;
        if n == 0 {
            return None;
        }
        head.extend_from_slice(&buf[..n]);
    }

    let text = String::from_utf8_lossy(&head);
    let mut lines = text.lines();
    let path = lines.next()?.split_whitespace().nth(1)?.to_string();
    let authorization = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("authorization"))
        .map(|(_, value)| value.trim().to_string());

    Some(SeenRequest { path, authorization })
}
