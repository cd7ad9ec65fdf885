//! Request routing subsystem: the mediator between handlers, authorisers
//! and the transport.
//!
//! # Data Flow
//! ```text
//! Handler → Router.dispatch(request)
//!     → table.rs (record RequestId → Weak<Handler>)
//!     → resilience::timeouts (arm watchdog if timeout > 0)
//!     → Upstream.perform_request(request, ResponseSink)
//!
//! Transport → ResponseSink → Router
//!     → partial events: table lookup, deliver, keep entry
//!     → terminal events: table pop, deliver at most once
//!     → 401 failures: resilience::retries decides on one re-authorisation
//!
//! Authoriser → AuthorisationSink → Router → Upstream observer (relay only)
//! ```
//!
//! # Design Decisions
//! - The table lock is never held while a handler or authoriser runs
//! - Handlers are held weakly; a dropped handler simply stops receiving
//! - Sinks hold the router weakly; events after teardown are no-ops

pub mod handler;
pub mod router;
pub mod sink;
pub mod table;

pub use handler::Handler;
pub use router::{Router, RouterBuilder, RouterError};
pub use sink::{AuthorisationSink, ResponseSink};
pub use table::OwnershipTable;
