//! Last-published leader addresses
//!
//! Staging is read-only; the caller commits only after the registry has
//! acknowledged the publish, so a failed publish is retried on the next
//! tick.

use std::collections::HashMap;
use std::fmt;

use crate::endpoint::Endpoint;

/// Logical name a leader is tracked under
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LeaderKey {
    /// The coordinator's own leader
    Coordinator,
    /// A watched sub-service, by its configured name prefix
    Service(String),
}

impl LeaderKey {
    pub fn service(name: impl Into<String>) -> Self {
        Self::Service(name.into())
    }
}

impl fmt::Display for LeaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaderKey::Coordinator => f.write_str("coordinator"),
            LeaderKey::Service(name) => f.write_str(name),
        }
    }
}

/// Map from logical name to the endpoint last published for it
#[derive(Debug, Default, Clone)]
pub struct AddressCache {
    entries: HashMap<LeaderKey, Endpoint>,
}

impl AddressCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &LeaderKey) -> Option<&Endpoint> {
        self.entries.get(key)
    }

    /// True when `candidate` would be a change for `key`
    pub fn compare_and_stage(&self, key: &LeaderKey, candidate: &Endpoint) -> bool {
        self.entries.get(key) != Some(candidate)
    }

    pub fn commit(&mut self, key: LeaderKey, value: Endpoint) {
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
