//! Upstream executor contract.

use std::sync::Arc;

use crate::http::{AuthorisationError, Request};
use crate::routing::ResponseSink;

/// Performs requests on behalf of the router.
pub trait Upstream: Send + Sync {
    /// Start `request`, reporting its events through `sink`.
    fn perform_request(&self, request: Arc<Request>, sink: ResponseSink) -> CancelHandle;

    /// Receiver of authoriser outcomes, if this upstream supports it.
    fn authorisation_observer(&self) -> Option<&dyn AuthorisationObserver> {
        None
    }
}

/// Optional upstream capability: react to authoriser outcomes.
pub trait AuthorisationObserver: Send + Sync {
    /// Credentials were attached to `request`.
    fn authorised_request(&self, request: Arc<Request>, sink: ResponseSink);

    /// Credential acquisition failed for `request`.
    fn failed_to_authorise_request(
        &self,
        request: Arc<Request>,
        error: AuthorisationError,
        sink: ResponseSink,
    );
}

/// One-shot cancellation handle produced by the upstream.
pub struct CancelHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl CancelHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Handle for a request that cannot be cancelled.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cancel_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = CancelHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        handle.cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        CancelHandle::noop().cancel();
    }
}
