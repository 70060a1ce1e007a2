use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use querybox_core::{CacheKey, Raw};

use crate::BackendError;

pub type BackendResult<T> = Result<T, BackendError>;

/// Status of deleting result.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteStatus {
    /// Record successfully deleted.
    Deleted(u32),
    /// Record already missing.
    Missing,
}

/// Key/value storage with per-entry time-to-live.
///
/// Every operation comes in a blocking form, used by synchronous dispatch,
/// and an async form, used by asynchronous dispatch. Both forms of one
/// backend must observe the same storage.
///
/// # Contract
///
/// - `ttl` of `None` or `Some(Duration::ZERO)` means the entry never expires.
/// - An expired entry reads as missing.
/// - Removing a missing key is not an error; it reports [`DeleteStatus::Missing`].
/// - No ordering is guaranteed between operations on different keys.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Reads the value stored under `key`.
    fn blocking_read(&self, key: &CacheKey) -> BackendResult<Option<Raw>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn blocking_write(&self, key: &CacheKey, value: Raw, ttl: Option<Duration>)
    -> BackendResult<()>;

    /// Removes the value stored under `key`.
    fn blocking_remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus>;

    /// Async form of [`blocking_read`](Backend::blocking_read).
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>>;

    /// Async form of [`blocking_write`](Backend::blocking_write).
    async fn write(&self, key: &CacheKey, value: Raw, ttl: Option<Duration>) -> BackendResult<()>;

    /// Async form of [`blocking_remove`](Backend::blocking_remove).
    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus>;

    /// Returns the name of this backend, used in logs and metrics.
    fn name(&self) -> &str {
        "backend"
    }
}

#[async_trait]
impl<B> Backend for Arc<B>
where
    B: Backend + ?Sized,
{
    fn blocking_read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        (**self).blocking_read(key)
    }

    fn blocking_write(
        &self,
        key: &CacheKey,
        value: Raw,
        ttl: Option<Duration>,
    ) -> BackendResult<()> {
        (**self).blocking_write(key, value, ttl)
    }

    fn blocking_remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        (**self).blocking_remove(key)
    }

    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &CacheKey, value: Raw, ttl: Option<Duration>) -> BackendResult<()> {
        (**self).write(key, value, ttl).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        (**self).remove(key).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<B> Backend for Box<B>
where
    B: Backend + ?Sized,
{
    fn blocking_read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        (**self).blocking_read(key)
    }

    fn blocking_write(
        &self,
        key: &CacheKey,
        value: Raw,
        ttl: Option<Duration>,
    ) -> BackendResult<()> {
        (**self).blocking_write(key, value, ttl)
    }

    fn blocking_remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        (**self).blocking_remove(key)
    }

    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &CacheKey, value: Raw, ttl: Option<Duration>) -> BackendResult<()> {
        (**self).write(key, value, ttl).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        (**self).remove(key).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
