//! Backend wrappers for observing and breaking the cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use querybox_backend::{Backend, BackendError, BackendResult, DeleteStatus};
use querybox_core::{CacheKey, Raw};
use querybox_memory::MemoryBackend;

#[derive(Debug, Default)]
pub struct BackendCounters {
    pub read_count: AtomicUsize,
    pub read_hit_count: AtomicUsize,
    pub write_count: AtomicUsize,
    pub remove_count: AtomicUsize,
}

impl BackendCounters {
    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }

    pub fn read_hit_count(&self) -> usize {
        self.read_hit_count.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    pub fn remove_count(&self) -> usize {
        self.remove_count.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.read_count.store(0, Ordering::SeqCst);
        self.read_hit_count.store(0, Ordering::SeqCst);
        self.write_count.store(0, Ordering::SeqCst);
        self.remove_count.store(0, Ordering::SeqCst);
    }

    fn record_read(&self, result: &BackendResult<Option<Raw>>) {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        if matches!(result, Ok(Some(_))) {
            self.read_hit_count.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Counts the operations reaching a [`MemoryBackend`].
///
/// Clones share both the storage and the counters.
#[derive(Clone, Debug, Default)]
pub struct CountingBackend {
    pub inner: MemoryBackend,
    pub counters: Arc<BackendCounters>,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_count(&self) -> usize {
        self.counters.read_count()
    }

    pub fn write_count(&self) -> usize {
        self.counters.write_count()
    }

    pub fn remove_count(&self) -> usize {
        self.counters.remove_count()
    }
}

#[async_trait]
impl Backend for CountingBackend {
    fn blocking_read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        let result = self.inner.blocking_read(key);
        self.counters.record_read(&result);
        result
    }

    fn blocking_write(
        &self,
        key: &CacheKey,
        value: Raw,
        ttl: Option<Duration>,
    ) -> BackendResult<()> {
        self.counters.write_count.fetch_add(1, Ordering::SeqCst);
        self.inner.blocking_write(key, value, ttl)
    }

    fn blocking_remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        self.counters.remove_count.fetch_add(1, Ordering::SeqCst);
        self.inner.blocking_remove(key)
    }

    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        let result = self.inner.read(key).await;
        self.counters.record_read(&result);
        result
    }

    async fn write(&self, key: &CacheKey, value: Raw, ttl: Option<Duration>) -> BackendResult<()> {
        self.counters.write_count.fetch_add(1, Ordering::SeqCst);
        self.inner.write(key, value, ttl).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        self.counters.remove_count.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key).await
    }

    fn name(&self) -> &str {
        "counting"
    }
}

#[derive(Debug, Default)]
struct Switches {
    reads: AtomicBool,
    writes: AtomicBool,
    removes: AtomicBool,
}

/// [`MemoryBackend`] whose operations can be made to fail on demand.
///
/// Clones share the storage and the failure switches, so a test can keep a
/// clone and flip switches after handing the backend to an api.
#[derive(Clone, Debug, Default)]
pub struct ErrorBackend {
    pub inner: MemoryBackend,
    switches: Arc<Switches>,
}

impl ErrorBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend failing every operation.
    pub fn broken() -> Self {
        let backend = Self::new();
        backend.fail_reads(true);
        backend.fail_writes(true);
        backend.fail_removes(true);
        backend
    }

    pub fn fail_reads(&self, fail: bool) {
        self.switches.reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.switches.writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removes(&self, fail: bool) {
        self.switches.removes.store(fail, Ordering::SeqCst);
    }

    fn check(switch: &AtomicBool) -> BackendResult<()> {
        if switch.load(Ordering::SeqCst) {
            Err(BackendError::connection(std::io::Error::other(
                "simulated backend failure",
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Backend for ErrorBackend {
    fn blocking_read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        Self::check(&self.switches.reads)?;
        self.inner.blocking_read(key)
    }

    fn blocking_write(
        &self,
        key: &CacheKey,
        value: Raw,
        ttl: Option<Duration>,
    ) -> BackendResult<()> {
        Self::check(&self.switches.writes)?;
        self.inner.blocking_write(key, value, ttl)
    }

    fn blocking_remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        Self::check(&self.switches.removes)?;
        self.inner.blocking_remove(key)
    }

    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        Self::check(&self.switches.reads)?;
        self.inner.read(key).await
    }

    async fn write(&self, key: &CacheKey, value: Raw, ttl: Option<Duration>) -> BackendResult<()> {
        Self::check(&self.switches.writes)?;
        self.inner.write(key, value, ttl).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        Self::check(&self.switches.removes)?;
        self.inner.remove(key).await
    }

    fn name(&self) -> &str {
        "error"
    }
}
