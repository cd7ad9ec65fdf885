//! Outbound request descriptor.
//!
//! # Responsibilities
//! - Identify a request for the lifetime of its flight (RequestId)
//! - Carry target, method, headers, body and deadline
//! - Hold the cache-policy flag and the one-shot authorisation retry flag
//!
//! # Design Decisions
//! - Identity is a UUID, not the allocation address
//! - Headers are interior-mutable so authorisers can attach credentials
//! - Retry flag is set with a swap so only one caller ever wins it

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Unique identifier of an in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the transport may use its cache for a request.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    #[default]
    UseProtocolPolicy = 0,
    ReloadIgnoringCache = 1,
    ReturnCacheDataElseLoad = 2,
    /// Cache only, never touch the network.
    ReturnCacheDataDontLoad = 3,
}

impl From<u8> for CachePolicy {
    fn from(val: u8) -> Self {
        match val {
            1 => CachePolicy::ReloadIgnoringCache,
            2 => CachePolicy::ReturnCacheDataElseLoad,
            3 => CachePolicy::ReturnCacheDataDontLoad,
            _ => CachePolicy::UseProtocolPolicy,
        }
    }
}

/// A request issued by a handler and tracked by the router while in flight.
#[derive(Debug)]
pub struct Request {
    id: RequestId,
    method: Method,
    target: Url,
    headers: Mutex<HeaderMap>,
    body: Option<Bytes>,
    timeout: Duration,
    chunks: bool,
    cache_policy: AtomicU8,
    retried_authorisation: AtomicBool,
}

impl Request {
    /// Start building a GET request for `target`.
    pub fn builder(target: Url) -> RequestBuilder {
        RequestBuilder::new(target)
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Host of the target URL, lowercased by the URL parser.
    pub fn host(&self) -> Option<&str> {
        self.target.host_str()
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Absolute deadline measured from dispatch. Zero disables the watchdog.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the payload is delivered as chunk events.
    pub fn chunks(&self) -> bool {
        self.chunks
    }

    /// Snapshot of the current headers.
    pub fn headers(&self) -> HeaderMap {
        self.headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn header(&self, name: &HeaderName) -> Option<HeaderValue> {
        self.headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Insert or replace a header, e.g. credentials attached by an authoriser.
    pub fn set_header(&self, name: HeaderName, value: HeaderValue) {
        self.headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, value);
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy::from(self.cache_policy.load(Ordering::Acquire))
    }

    pub fn set_cache_policy(&self, policy: CachePolicy) {
        self.cache_policy.store(policy as u8, Ordering::Release);
    }

    pub fn retried_authorisation(&self) -> bool {
        self.retried_authorisation.load(Ordering::Acquire)
    }

    /// Set the retry flag. Returns true only for the call that flipped it.
    pub fn mark_retried_authorisation(&self) -> bool {
        !self.retried_authorisation.swap(true, Ordering::AcqRel)
    }
}

/// Fluent constructor for [`Request`].
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    target: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    timeout: Duration,
    chunks: bool,
    cache_policy: CachePolicy,
}

impl RequestBuilder {
    pub fn new(target: Url) -> Self {
        Self {
            method: Method::GET,
            target,
            headers: HeaderMap::new(),
            body: None,
            timeout: Duration::ZERO,
            chunks: false,
            cache_policy: CachePolicy::default(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn chunks(mut self, chunks: bool) -> Self {
        self.chunks = chunks;
        self
    }

    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    pub fn build(self) -> Arc<Request> {
        Arc::new(Request {
            id: RequestId::new(),
            method: self.method,
            target: self.target,
            headers: Mutex::new(self.headers),
            body: self.body,
            timeout: self.timeout,
            chunks: self.chunks,
            cache_policy: AtomicU8::new(self.cache_policy as u8),
            retried_authorisation: AtomicBool::new(false),
        })
    }
}
