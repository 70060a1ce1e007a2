//! Tag-indexed response cache.
//!
//! [`Cache`] layers two kinds of entries over a plain key/value
//! [`Backend`]:
//!
//! - a **primary entry** under `{endpoint}/{canonical json of the request}`
//!   holding the JSON-encoded response;
//! - a **tag index entry** under `tags/{tag}` holding the primary key of the
//!   response that most recently carried that tag.
//!
//! # Tag index semantics
//!
//! A tag index entry holds one primary key, and every write overwrites it.
//! Invalidating a tag therefore removes only the most recent response that
//! carried it:
//!
//! ```
//! use querybox::Cache;
//! use querybox_core::TagSet;
//! use querybox_memory::MemoryBackend;
//!
//! let cache = Cache::new(MemoryBackend::new());
//! let tags = TagSet::from("Items");
//!
//! cache.set("listItems", &1, &tags, &"page one", None).unwrap();
//! cache.set("listItems", &2, &tags, &"page two", None).unwrap();
//! cache.invalidate_tags("updateItem", &tags).unwrap();
//!
//! assert_eq!(cache.get_by_request::<_, String>("listItems", &2).unwrap(), None);
//! // Superseded in the tag index, so still served until it expires.
//! assert_eq!(
//!     cache.get_by_request::<_, String>("listItems", &1).unwrap().as_deref(),
//!     Some("page one"),
//! );
//! ```
//!
//! Multi-key writes are not atomic. A failure between sub-writes can leave a
//! primary entry that no tag reaches, or a tag entry whose primary entry is
//! missing. Reads treat the latter as a miss.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use querybox_backend::fanout::{collect_results, join_all_ops};
use querybox_backend::{Backend, BackendError, BackendResult, JsonFormat};
use querybox_core::{CacheKey, Tag, TagSet};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, trace};

use crate::error::CacheError;

/// Tag-indexed cache over a shared [`Backend`].
///
/// Cloning is cheap; clones use the same backend.
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn Backend>,
    format: JsonFormat,
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl Cache {
    /// Creates a cache owning `backend`.
    pub fn new<B>(backend: B) -> Self
    where
        B: Backend + 'static,
    {
        Self::from_arc(Arc::new(backend))
    }

    /// Creates a cache over an already shared backend.
    pub fn from_arc(backend: Arc<dyn Backend>) -> Self {
        Cache {
            backend,
            format: JsonFormat,
        }
    }

    /// Returns the backend.
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Derives the primary key of `request` sent to `endpoint`.
    pub fn primary_key<R>(&self, endpoint: &str, request: &R) -> Result<CacheKey, CacheError>
    where
        R: Serialize + ?Sized,
    {
        Ok(CacheKey::for_request(endpoint, request)?)
    }

    fn decode<V: DeserializeOwned>(&self, raw: Option<querybox_core::Raw>) -> BackendResult<Option<V>> {
        raw.map(|raw| self.format.deserialize(&raw))
            .transpose()
            .map_err(BackendError::from)
    }

    /// Reads the response cached for `request`.
    #[instrument(level = "debug", skip(self, request), fields(backend = self.backend.name()))]
    pub fn get_by_request<R, V>(&self, endpoint: &str, request: &R) -> Result<Option<V>, CacheError>
    where
        R: Serialize + ?Sized,
        V: DeserializeOwned,
    {
        let key = self.primary_key(endpoint, request)?;
        let value = self.decode(self.backend.blocking_read(&key)?)?;
        trace!(%key, hit = value.is_some(), "Primary entry lookup");
        Ok(value)
    }

    /// Caches `response` for `request` and points every tag in `tags` at it.
    ///
    /// All sub-writes are attempted even when one fails. Successful writes
    /// are not rolled back.
    #[instrument(level = "debug", skip(self, request, response), fields(backend = self.backend.name()))]
    pub fn set<R, V>(
        &self,
        endpoint: &str,
        request: &R,
        tags: &TagSet,
        response: &V,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError>
    where
        R: Serialize + ?Sized,
        V: Serialize + ?Sized,
    {
        let key = self.primary_key(endpoint, request)?;
        let value = self.format.serialize(response).map_err(BackendError::from)?;
        let pointer = self.format.serialize_key(&key);

        let mut results = Vec::with_capacity(tags.len() + 1);
        results.push(self.backend.blocking_write(&key, value, ttl));
        for tag in tags {
            let tag_key = CacheKey::for_tag(tag);
            trace!(%tag_key, %key, "Writing tag index entry");
            results.push(self.backend.blocking_write(&tag_key, pointer.clone(), ttl));
        }
        Ok(collect_results(results)?)
    }

    /// Returns the response behind the first tag, in order, that reaches one.
    ///
    /// A tag whose index entry points at a missing primary entry is skipped.
    #[instrument(level = "debug", skip(self), fields(backend = self.backend.name()))]
    pub fn get_by_tags<V>(&self, endpoint: &str, tags: &TagSet) -> Result<Option<V>, CacheError>
    where
        V: DeserializeOwned,
    {
        for tag in tags {
            let Some(pointer) = self.backend.blocking_read(&CacheKey::for_tag(tag))? else {
                continue;
            };
            let key = self.format.deserialize_key(&pointer).map_err(BackendError::from)?;
            match self.decode(self.backend.blocking_read(&key)?)? {
                Some(value) => return Ok(Some(value)),
                None => trace!(%tag, %key, "Dangling tag index entry"),
            }
        }
        Ok(None)
    }

    /// Removes, for every tag, the response its index entry points at and
    /// then the index entry itself.
    ///
    /// `endpoint` names the caller in logs only; tag keys are shared by all
    /// endpoints.
    #[instrument(level = "debug", skip(self), fields(backend = self.backend.name()))]
    pub fn invalidate_tags(&self, endpoint: &str, tags: &TagSet) -> Result<(), CacheError> {
        let results: Vec<_> = tags.iter().map(|tag| self.invalidate_tag(tag)).collect();
        Ok(collect_results(results)?)
    }

    fn invalidate_tag(&self, tag: &Tag) -> BackendResult<()> {
        let tag_key = CacheKey::for_tag(tag);
        if let Some(pointer) = self.backend.blocking_read(&tag_key)? {
            let key = self.format.deserialize_key(&pointer)?;
            let status = self.backend.blocking_remove(&key)?;
            debug!(%tag, %key, ?status, "Invalidated tagged entry");
        }
        self.backend.blocking_remove(&tag_key)?;
        Ok(())
    }

    /// Async form of [`get_by_request`](Self::get_by_request).
    #[instrument(level = "debug", skip(self, request), fields(backend = self.backend.name()))]
    pub async fn aget_by_request<R, V>(
        &self,
        endpoint: &str,
        request: &R,
    ) -> Result<Option<V>, CacheError>
    where
        R: Serialize + ?Sized,
        V: DeserializeOwned,
    {
        let key = self.primary_key(endpoint, request)?;
        let value = self.decode(self.backend.read(&key).await?)?;
        trace!(%key, hit = value.is_some(), "Primary entry lookup");
        Ok(value)
    }

    /// Async form of [`set`](Self::set).
    ///
    /// The primary write and every tag write run concurrently; the call
    /// returns once all of them have finished.
    #[instrument(level = "debug", skip(self, request, response), fields(backend = self.backend.name()))]
    pub async fn aset<R, V>(
        &self,
        endpoint: &str,
        request: &R,
        tags: &TagSet,
        response: &V,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError>
    where
        R: Serialize + ?Sized,
        V: Serialize + ?Sized,
    {
        let key = self.primary_key(endpoint, request)?;
        let value = self.format.serialize(response).map_err(BackendError::from)?;
        let pointer = self.format.serialize_key(&key);
        let tag_keys: Vec<CacheKey> = tags.iter().map(CacheKey::for_tag).collect();

        let primary = std::iter::once((&key, value));
        let index = tag_keys.iter().map(|tag_key| (tag_key, pointer.clone()));
        let writes: Vec<_> = primary
            .chain(index)
            .map(|(target, raw)| self.backend.write(target, raw, ttl))
            .collect();
        Ok(join_all_ops(writes).await?)
    }

    /// Async form of [`get_by_tags`](Self::get_by_tags).
    ///
    /// Tags are tried one after another, in order.
    #[instrument(level = "debug", skip(self), fields(backend = self.backend.name()))]
    pub async fn aget_by_tags<V>(
        &self,
        endpoint: &str,
        tags: &TagSet,
    ) -> Result<Option<V>, CacheError>
    where
        V: DeserializeOwned,
    {
        for tag in tags {
            let Some(pointer) = self.backend.read(&CacheKey::for_tag(tag)).await? else {
                continue;
            };
            let key = self.format.deserialize_key(&pointer).map_err(BackendError::from)?;
            match self.decode(self.backend.read(&key).await?)? {
                Some(value) => return Ok(Some(value)),
                None => trace!(%tag, %key, "Dangling tag index entry"),
            }
        }
        Ok(None)
    }

    /// Async form of [`invalidate_tags`](Self::invalidate_tags).
    ///
    /// Tags are invalidated concurrently.
    #[instrument(level = "debug", skip(self), fields(backend = self.backend.name()))]
    pub async fn ainvalidate_tags(&self, endpoint: &str, tags: &TagSet) -> Result<(), CacheError> {
        let ops: Vec<_> = tags.iter().map(|tag| self.ainvalidate_tag(tag)).collect();
        Ok(join_all_ops(ops).await?)
    }

    async fn ainvalidate_tag(&self, tag: &Tag) -> BackendResult<()> {
        let tag_key = CacheKey::for_tag(tag);
        if let Some(pointer) = self.backend.read(&tag_key).await? {
            let key = self.format.deserialize_key(&pointer)?;
            let status = self.backend.remove(&key).await?;
            debug!(%tag, %key, ?status, "Invalidated tagged entry");
        }
        self.backend.remove(&tag_key).await?;
        Ok(())
    }
}
