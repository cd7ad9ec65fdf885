//! Caller-side callback contract.

use axum::body::Bytes;
use std::sync::Arc;

use crate::http::{Request, Response};

/// Receiver of the events for the requests it dispatched.
///
/// Exactly one of the terminal callbacks (`successful_response`,
/// `failed_response`, `cancelled_request`) is invoked per request, at most
/// once. Partial callbacks only arrive before it.
pub trait Handler: Send + Sync {
    fn successful_response(&self, response: Response);

    fn failed_response(&self, response: Response);

    fn cancelled_request(&self, request: Arc<Request>);

    fn received_data_chunk(&self, _data: Bytes, _response: &Response) {}

    fn received_initial_response(&self, _response: &Response) {}
}
