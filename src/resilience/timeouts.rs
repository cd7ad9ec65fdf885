//! Timeout watchdog.
//!
//! # Responsibilities
//! - Schedule a deadline relative to dispatch
//! - Feed a synthetic timeout failure through the normal failure path
//!
//! # Design Decisions
//! - Holds the router weakly; firing after the router is gone is a no-op
//! - Holds the request until the deadline so an abandoned request still resolves
//! - Not cancelled when a response arrives; the ownership table pop decides

use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::http::Request;
use crate::routing::Router;

/// Arm the watchdog for `request` on `runtime`.
pub fn arm_watchdog(runtime: &Handle, router: Weak<Router>, request: &Arc<Request>) -> JoinHandle<()> {
    let deadline = request.timeout();
    let request = Arc::clone(request);

    runtime.spawn(async move {
        tokio::time::sleep(deadline).await;

        if let Some(router) = router.upgrade() {
            router.request_timed_out(request);
        }
    })
}
