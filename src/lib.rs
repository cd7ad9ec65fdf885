//! Request-routing mediator for an HTTP data-loading client.
//!
//! # Architecture Overview
//!
//! ```text
//!   Handler ──dispatch──▶ ┌──────────────────────────────┐ ──perform_request──▶ Upstream
//!                         │            Router            │                     (transport)
//!   Handler ◀──events──── │  ownership table (weak)      │ ◀──ResponseSink────
//!                         │  authorisation retry (once)  │
//!                         │  timeout watchdog            │ ──authorise──▶ Authoriser
//!                         │  authoriser relay            │ ◀──AuthorisationSink──
//!                         └──────────────────────────────┘
//! ```
//!
//! - `http`: request/response value objects and error kinds
//! - `routing`: the router, its ownership table and weak callback sinks
//! - `resilience`: authorisation retry decision and timeout watchdog
//! - `auth`: authoriser contract, ordered list, bearer-token authoriser
//! - `transport`: upstream contract and the hyper-backed executor
//! - `config`, `observability`: ambient configuration, logging and metrics

pub mod auth;
pub mod config;
pub mod http;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod transport;

pub use config::MediatorConfig;
pub use http::{CachePolicy, LoadError, Request, Response};
pub use routing::{Handler, Router, RouterBuilder, RouterError};
pub use transport::{CancelHandle, HyperTransport, Upstream};
