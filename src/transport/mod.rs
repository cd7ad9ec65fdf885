//! Transport subsystem.
//!
//! # Data Flow
//! ```text
//! Router.dispatch
//!     → executor.rs (Upstream.perform_request → CancelHandle)
//!     → client.rs (authorise first if claimed, then execute on Tokio)
//!     → ResponseSink (initial response, chunks, terminal event)
//!
//! Authoriser done:
//!     → Router relay → AuthorisationObserver (client.rs executes the request)
//! ```
//!
//! # Design Decisions
//! - The router never performs I/O; the upstream owns execution and cancellation
//! - The authorisation notification is an optional capability, not a required method
//! - No response cache: cache-only requests fail with `NotCached`

pub mod executor;
pub mod client;

pub use executor::{AuthorisationObserver, CancelHandle, Upstream};
pub use client::HyperTransport;
