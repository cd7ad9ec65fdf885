//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch with timeout > 0:
//!     → timeouts.rs (arm watchdog on the router runtime)
//!     → on fire: synthetic timeout Response → Router.failed_response
//!
//! Any failure:
//!     → retries.rs (401 and not yet retried? re-authorise once)
//!     → otherwise terminal delivery
//! ```
//!
//! # Design Decisions
//! - Exactly one authorisation retry per request, regardless of authoriser count
//! - Watchdogs are never cancelled; the ownership table makes late fires no-ops
//! - No backoff: the only retry is the authorisation retry

pub mod retries;
pub mod timeouts;
