//! Authorisation subsystem.
//!
//! # Data Flow
//! ```text
//! Transport asks Router.should_authorise_request
//!     → authoriser.rs (ordered list, first relevant wins)
//!     → Authoriser attaches credentials asynchronously
//!     → AuthorisationSink reports back to the Router
//!     → Router relays to the upstream observer (which executes the request)
//!
//! 401 response:
//!     → every relevant authoriser told via request_failed_authorisation
//!     → first relevant authoriser re-authorises (once per request)
//! ```
//!
//! # Design Decisions
//! - The list is fixed at construction; iteration needs no lock
//! - Failure notification fans out, re-authorisation does not
//! - bearer.rs is a concrete authoriser backed by static token lists

pub mod authoriser;
pub mod bearer;

pub use authoriser::{Authoriser, AuthoriserList};
pub use bearer::BearerTokenAuthoriser;
