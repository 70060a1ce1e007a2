//! [`MemoryBackend`] implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use querybox_backend::{Backend, BackendResult, DeleteStatus};
use querybox_core::{CacheKey, Raw};
use smol_str::SmolStr;
use tracing::trace;

use crate::builder::MemoryBackendBuilder;
use crate::entry::CacheEntry;

/// In-process cache backend with read-triggered expiry.
///
/// Storage is a sharded concurrent map, so the backend can be shared between
/// threads without an outer lock. Clones share the same storage.
///
/// Expired entries are not swept in the background. They stay in storage,
/// and count towards [`len`](Self::len), until a read for their key finds
/// them expired and evicts them.
///
/// The blocking and async forms of every operation touch the same map and
/// never suspend, so both are safe to call from any context.
#[derive(Clone, Debug)]
pub struct MemoryBackend {
    pub(crate) store: Arc<DashMap<CacheKey, CacheEntry>>,
    pub(crate) name: SmolStr,
}

impl MemoryBackend {
    /// Creates a new builder for `MemoryBackend`.
    #[must_use]
    pub fn builder() -> MemoryBackendBuilder {
        MemoryBackendBuilder::default()
    }

    /// Creates an empty backend with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Returns the number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Returns `true` when an entry for `key` is stored, expired or not.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.store.contains_key(key)
    }

    /// Returns a copy of the stored entry without checking expiry.
    pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.store.get(key).map(|entry| entry.value().clone())
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.store.clear();
    }

    fn lookup(&self, key: &CacheKey) -> Option<Raw> {
        let now = Utc::now();
        match self.store.get(key) {
            None => return None,
            Some(entry) if !entry.is_expired_at(now) => return Some(entry.value().value().clone()),
            Some(_) => {}
        }
        // The shard guard above is released before removal.
        if self.store.remove_if(key, |_, entry| entry.is_expired_at(now)).is_some() {
            trace!(backend = %self.name, %key, "Evicted expired entry");
        }
        None
    }

    fn insert(&self, key: &CacheKey, value: Raw, ttl: Option<Duration>) {
        let entry = CacheEntry::new(value, ttl, Utc::now());
        self.store.insert(key.clone(), entry);
    }

    fn delete(&self, key: &CacheKey) -> DeleteStatus {
        match self.store.remove(key) {
            Some(_) => DeleteStatus::Deleted(1),
            None => DeleteStatus::Missing,
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn blocking_read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        Ok(self.lookup(key))
    }

    fn blocking_write(
        &self,
        key: &CacheKey,
        value: Raw,
        ttl: Option<Duration>,
    ) -> BackendResult<()> {
        self.insert(key, value, ttl);
        Ok(())
    }

    fn blocking_remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        Ok(self.delete(key))
    }

    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        Ok(self.lookup(key))
    }

    async fn write(&self, key: &CacheKey, value: Raw, ttl: Option<Duration>) -> BackendResult<()> {
        self.insert(key, value, ttl);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        Ok(self.delete(key))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
