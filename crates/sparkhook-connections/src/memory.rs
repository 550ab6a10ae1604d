//! In-memory connection store.

use std::collections::BTreeMap;

use crate::{ConnectionProfile, ConnectionStore};

/// A connection store held entirely in memory.
///
/// Later inserts replace earlier ones with the same id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConnections {
    profiles: BTreeMap<String, ConnectionProfile>,
}

impl InMemoryConnections {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding only the stock `spark_default` profile.
    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        store.insert(ConnectionProfile::spark_default());
        store
    }

    /// Insert or replace a profile.
    pub fn insert(&mut self, profile: ConnectionProfile) {
        self.profiles.insert(profile.conn_id.clone(), profile);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, profile: ConnectionProfile) -> Self {
        self.insert(profile);
        self
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl ConnectionStore for InMemoryConnections {
    fn get_connection(&self, conn_id: &str) -> Option<ConnectionProfile> {
        self.profiles.get(conn_id).cloned()
    }
}

impl FromIterator<ConnectionProfile> for InMemoryConnections {
    fn from_iter<I: IntoIterator<Item = ConnectionProfile>>(iter: I) -> Self {
        let mut store = Self::new();
        for profile in iter {
            store.insert(profile);
        }
        store
    }
}
