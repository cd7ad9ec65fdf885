//! In-flight ownership table.
//!
//! # Responsibilities
//! - Map each tracked RequestId to the handler that issued it
//! - Look up without removal for partial events
//! - Remove atomically for terminal events
//!
//! # Design Decisions
//! - Single coarse mutex scoped to the map, never to the router
//! - Handlers stored as `Weak`; the table never extends their lifetime
//! - Upgraded handles are returned to the caller and used after unlock

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::http::RequestId;
use crate::routing::handler::Handler;

#[derive(Default)]
pub struct OwnershipTable {
    entries: Mutex<HashMap<RequestId, Weak<dyn Handler>>>,
}

impl OwnershipTable {
    pub fn new() -> Self {
        Self::default()
    }

    // Entries are weak references only, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<RequestId, Weak<dyn Handler>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track `id`. Returns false if it is already tracked.
    pub fn insert(&self, id: RequestId, handler: Weak<dyn Handler>) -> bool {
        match self.lock().entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(handler);
                true
            }
        }
    }

    /// Live handler for `id`, leaving the entry in place.
    /// An entry whose handler has been dropped is pruned.
    pub fn get(&self, id: RequestId) -> Option<Arc<dyn Handler>> {
        let mut entries = self.lock();
        let handler = entries.get(&id)?.upgrade();
        if handler.is_none() {
            entries.remove(&id);
        }
        handler
    }

    /// Remove `id` and return its handler if it is still alive.
    pub fn pop(&self, id: RequestId) -> Option<Arc<dyn Handler>> {
        let handler = self.lock().remove(&id)?;
        handler.upgrade()
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl std::fmt::Debug for OwnershipTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnershipTable")
            .field("len", &self.len())
            .finish()
    }
}
