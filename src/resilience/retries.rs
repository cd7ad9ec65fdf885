//! Authorisation retry decision.
//!
//! # States
//! ```text
//! Normal ──401 & !retried──▶ Retrying ──authorised──▶ Normal (request re-performed)
//!    │                          │
//!    │                          └─ no authoriser claims it ─▶ Terminal
//!    └──other failure, or 401 after retry──────────────────▶ Terminal
//! ```

use std::sync::Arc;

use crate::auth::{Authoriser, AuthoriserList};
use crate::http::Response;

/// What to do with a failed response.
pub enum RetryDecision {
    /// Swallow the failure and re-authorise through this authoriser.
    Retry(Arc<dyn Authoriser>),
    /// Deliver the failure to the owning handler.
    Deliver,
}

/// Decide whether `response` starts the request's one authorisation retry.
///
/// On an unauthorised response for a request that has not been retried,
/// every relevant authoriser is told the credentials failed, the request is
/// marked as retried, and the first authoriser still claiming it is chosen.
pub fn evaluate_failure(authorisers: &AuthoriserList, response: &Response) -> RetryDecision {
    let request = response.request();
    if !response.is_unauthorised() || request.retried_authorisation() {
        return RetryDecision::Deliver;
    }

    for authoriser in authorisers.relevant(request) {
        tracing::debug!(
            request_id = %request.id(),
            authoriser = authoriser.name(),
            "Notifying authoriser of failed authorisation"
        );
        authoriser.request_failed_authorisation(request);
    }

    // Two concurrent 401s for one request: only one may start a retry.
    if !request.mark_retried_authorisation() {
        return RetryDecision::Deliver;
    }

    match authorisers.first_relevant(request) {
        Some(authoriser) => RetryDecision::Retry(authoriser),
        None => RetryDecision::Deliver,
    }
}
