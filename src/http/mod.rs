//! Request and response value objects.
//!
//! # Data Flow
//! ```text
//! Handler builds Request (request.rs)
//!     → Router tracks it by RequestId
//!     → Transport executes it, produces Response (response.rs)
//!     → or the watchdog synthesizes a timeout Response
//!     → errors carried as LoadError (error.rs)
//! ```
//!
//! # Design Decisions
//! - Requests are shared as `Arc<Request>`; the few mutable fields are atomics
//! - Responses are cheap to clone and always reference their request
//! - "Unauthorised" is detected from the status code, never from error text

pub mod error;
pub mod request;
pub mod response;

pub use error::{AuthorisationError, LoadError};
pub use request::{CachePolicy, Request, RequestBuilder, RequestId};
pub use response::Response;

/// Status code that triggers the authorisation retry cycle.
pub const UNAUTHORISED_STATUS: u16 = 401;
