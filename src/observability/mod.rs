//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Router, transport, authorisers produce:
//!     → logging.rs (structured tracing events, request_id on every event)
//!     → metrics.rs (counters and the in-flight gauge)
//!
//! Consumers:
//!     → stdout via tracing-subscriber fmt layer
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log event as a field
//! - Metrics calls are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
