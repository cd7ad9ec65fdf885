//! Authoriser contract and the ordered authoriser list.

use std::sync::Arc;

use crate::http::Request;
use crate::routing::AuthorisationSink;

/// Pluggable credential provider.
pub trait Authoriser: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Whether this authoriser is responsible for `request`.
    fn requires_authorisation(&self, request: &Request) -> bool;

    /// Attach credentials and report back through `sink`, possibly later.
    fn authorise_request(&self, request: Arc<Request>, sink: AuthorisationSink);

    /// Credentials attached to `request` were rejected.
    fn request_failed_authorisation(&self, request: &Request);
}

/// Ordered, immutable collection of authorisers.
#[derive(Clone, Default)]
pub struct AuthoriserList {
    authorisers: Vec<Arc<dyn Authoriser>>,
}

impl AuthoriserList {
    pub fn new(authorisers: Vec<Arc<dyn Authoriser>>) -> Self {
        Self { authorisers }
    }

    pub fn len(&self) -> usize {
        self.authorisers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authorisers.is_empty()
    }

    /// Authorisers claiming `request`, in list order.
    pub fn relevant<'a>(
        &'a self,
        request: &'a Request,
    ) -> impl Iterator<Item = &'a Arc<dyn Authoriser>> + 'a {
        self.authorisers
            .iter()
            .filter(move |a| a.requires_authorisation(request))
    }

    /// First authoriser claiming `request`.
    pub fn first_relevant(&self, request: &Request) -> Option<Arc<dyn Authoriser>> {
        self.relevant(request).next().cloned()
    }

    pub fn should_authorise(&self, request: &Request) -> bool {
        self.relevant(request).next().is_some()
    }
}

impl std::fmt::Debug for AuthoriserList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.authorisers.iter().map(|a| a.name()))
            .finish()
    }
}
