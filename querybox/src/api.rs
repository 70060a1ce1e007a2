//! Dispatch engine.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use querybox_backend::Backend;
use querybox_core::{Cacheable, EndpointMode, Provides, TagSet, Transport};
use serde::Serialize;
use smol_str::SmolStr;
use tokio::runtime::Handle;
use tracing::{debug, instrument, warn};

use crate::cache::Cache;
use crate::config::{ApiConfig, BackendErrorPolicy};
use crate::error::{ApiError, CacheError};
use crate::handle::DispatchHandle;
use crate::metrics;
use crate::offload::{OffloadConfig, OffloadManager};
use crate::registry::{EndpointOptions, Registry};

struct Inner<Req, T> {
    transport: T,
    registry: Registry<Req>,
    cache: Option<Cache>,
    config: ApiConfig,
    offload: OffloadManager,
}

/// Typed api client: named queries and mutations over a [`Transport`],
/// with an optional tag-indexed [`Cache`].
///
/// Every call comes in a blocking form ([`query`](Self::query),
/// [`mutate`](Self::mutate)) and an async form
/// ([`query_async`](Self::query_async), [`mutate_async`](Self::mutate_async)).
/// Async calls start running immediately on the current Tokio runtime and
/// return a [`DispatchHandle`]; their cache side effects happen whether or
/// not the handle is ever awaited.
///
/// Endpoints are registered once through [`ApiBuilder`]; the built `Api`
/// is immutable and cheap to clone.
pub struct Api<Req, T> {
    inner: Arc<Inner<Req, T>>,
}

impl<Req, T> Clone for Api<Req, T> {
    fn clone(&self) -> Self {
        Api {
            inner: self.inner.clone(),
        }
    }
}

impl<Req, T> fmt::Debug for Api<Req, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("registry", &self.inner.registry)
            .field("cache", &self.inner.cache)
            .field("config", &self.inner.config)
            .finish()
    }
}

impl<Req, T> Api<Req, T>
where
    Req: Serialize + Send + Sync + 'static,
    T: Transport<Req> + 'static,
    T::Response: 'static,
{
    /// Starts the setup phase of an api over `transport`.
    pub fn builder(transport: T) -> ApiBuilder<Req, T> {
        ApiBuilder::new(transport)
    }

    /// Runs the query `name` and blocks until it completes.
    ///
    /// Returns the cached response when there is one. Otherwise calls the
    /// transport and caches the response under the request and its tags.
    pub fn query<A>(&self, name: &str, args: &A) -> Result<T::Response, ApiError<T::Error>>
    where
        A: Any,
        T::Response: Cacheable,
    {
        self.prepare(name, EndpointMode::Query, args)?.query()
    }

    /// Runs the mutation `name` and blocks until it completes.
    ///
    /// Calls the transport, then invalidates the tags the mutation carries.
    pub fn mutate<A>(&self, name: &str, args: &A) -> Result<T::Response, ApiError<T::Error>>
    where
        A: Any,
    {
        self.prepare(name, EndpointMode::Mutation, args)?.mutate()
    }

    /// Starts the query `name` in the background.
    ///
    /// Configuration errors are returned right away, before anything runs.
    /// Everything else arrives through the handle.
    pub fn query_async<A>(
        &self,
        name: &str,
        args: &A,
    ) -> Result<DispatchHandle<T::Response, T::Error>, ApiError<T::Error>>
    where
        A: Any,
        T::Response: Cacheable,
    {
        let dispatch = self.prepare(name, EndpointMode::Query, args)?;
        let runtime = Handle::try_current().map_err(|_| ApiError::NoRuntime)?;
        let task = self
            .inner
            .offload
            .spawn(&runtime, name, dispatch.query_async());
        Ok(DispatchHandle::new(task))
    }

    /// Starts the mutation `name` in the background.
    ///
    /// The mutation, and its tag invalidation, runs to completion even if
    /// the returned handle is dropped.
    pub fn mutate_async<A>(
        &self,
        name: &str,
        args: &A,
    ) -> Result<DispatchHandle<T::Response, T::Error>, ApiError<T::Error>>
    where
        A: Any,
    {
        let dispatch = self.prepare(name, EndpointMode::Mutation, args)?;
        let runtime = Handle::try_current().map_err(|_| ApiError::NoRuntime)?;
        let task = self
            .inner
            .offload
            .spawn(&runtime, name, dispatch.mutate_async());
        Ok(DispatchHandle::new(task))
    }

    fn prepare<A>(
        &self,
        name: &str,
        mode: EndpointMode,
        args: &A,
    ) -> Result<Dispatch<Req, T>, ApiError<T::Error>>
    where
        A: Any,
    {
        let endpoint = self.inner.registry.lookup(name, mode)?;
        let (request, tags) = endpoint.build(args)?.into_parts();
        let ttl = endpoint
            .options()
            .ttl_override()
            .or(self.inner.config.cache.ttl);
        Ok(Dispatch {
            inner: self.inner.clone(),
            endpoint: SmolStr::new(endpoint.name()),
            request,
            tags,
            ttl,
        })
    }
}

impl<Req, T> Api<Req, T> {
    /// Waits until every async dispatch started so far has finished.
    pub async fn wait_idle(&self) {
        self.inner.offload.wait_all().await
    }

    /// Returns the number of async dispatches still running.
    pub fn active_dispatches(&self) -> usize {
        self.inner.offload.active_task_count()
    }

    /// Returns the cache, if one was configured.
    pub fn cache(&self) -> Option<&Cache> {
        self.inner.cache.as_ref()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Returns the endpoint registry.
    pub fn registry(&self) -> &Registry<Req> {
        &self.inner.registry
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }
}

/// One prepared call: endpoint resolved, request built, nothing sent yet.
struct Dispatch<Req, T> {
    inner: Arc<Inner<Req, T>>,
    endpoint: SmolStr,
    request: Req,
    tags: TagSet,
    ttl: Option<Duration>,
}

impl<Req, T> Dispatch<Req, T>
where
    Req: Serialize + Send + Sync,
    T: Transport<Req>,
{
    /// Applies the backend error policy to a cache operation.
    fn recover<V>(
        &self,
        operation: &'static str,
        result: Result<V, CacheError>,
    ) -> Result<V, ApiError<T::Error>>
    where
        V: Default,
    {
        match result {
            Ok(value) => Ok(value),
            Err(CacheError::Key(err)) => Err(ApiError::Key(err)),
            Err(CacheError::Backend(err)) => {
                metrics::record_backend_error(&self.endpoint, operation);
                match self.inner.config.cache.on_backend_error {
                    BackendErrorPolicy::FailOpen => {
                        warn!(operation, error = %err, "Cache backend failed, continuing without cache");
                        Ok(V::default())
                    }
                    BackendErrorPolicy::FailClosed => Err(ApiError::Backend(err)),
                }
            }
        }
    }

    fn call(&self) -> Result<T::Response, ApiError<T::Error>> {
        let start = Instant::now();
        let result = self.inner.transport.call(&self.endpoint, &self.request);
        metrics::record_transport(&self.endpoint, start.elapsed(), result.is_ok());
        result.map_err(ApiError::Transport)
    }

    async fn call_async(&self) -> Result<T::Response, ApiError<T::Error>> {
        let start = Instant::now();
        let result = self
            .inner
            .transport
            .call_async(&self.endpoint, &self.request)
            .await;
        metrics::record_transport(&self.endpoint, start.elapsed(), result.is_ok());
        result.map_err(ApiError::Transport)
    }

    #[instrument(name = "query", skip_all, fields(endpoint = %self.endpoint))]
    fn query(self) -> Result<T::Response, ApiError<T::Error>>
    where
        T::Response: Cacheable,
    {
        let Some(cache) = &self.inner.cache else {
            return self.call();
        };

        let cached: Option<T::Response> =
            self.recover("read", cache.get_by_request(&self.endpoint, &self.request))?;
        metrics::record_cache_lookup(&self.endpoint, cached.is_some());
        if let Some(response) = cached {
            debug!("Cache hit");
            return Ok(response);
        }
        debug!("Cache miss");

        let response = self.call()?;
        self.recover(
            "write",
            cache.set(&self.endpoint, &self.request, &self.tags, &response, self.ttl),
        )?;
        Ok(response)
    }

    #[instrument(name = "query", skip_all, fields(endpoint = %self.endpoint))]
    async fn query_async(self) -> Result<T::Response, ApiError<T::Error>>
    where
        T::Response: Cacheable,
    {
        let Some(cache) = &self.inner.cache else {
            return self.call_async().await;
        };

        let cached: Option<T::Response> = self.recover(
            "read",
            cache.aget_by_request(&self.endpoint, &self.request).await,
        )?;
        metrics::record_cache_lookup(&self.endpoint, cached.is_some());
        if let Some(response) = cached {
            debug!("Cache hit");
            return Ok(response);
        }
        debug!("Cache miss");

        let response = self.call_async().await?;
        self.recover(
            "write",
            cache
                .aset(&self.endpoint, &self.request, &self.tags, &response, self.ttl)
                .await,
        )?;
        Ok(response)
    }

    #[instrument(name = "mutation", skip_all, fields(endpoint = %self.endpoint))]
    fn mutate(self) -> Result<T::Response, ApiError<T::Error>> {
        let response = self.call()?;
        if let Some(cache) = &self.inner.cache
            && !self.tags.is_empty()
        {
            self.recover("invalidate", cache.invalidate_tags(&self.endpoint, &self.tags))?;
            metrics::record_invalidation(&self.endpoint, self.tags.len());
            debug!(tags = self.tags.len(), "Invalidated tags");
        }
        Ok(response)
    }

    #[instrument(name = "mutation", skip_all, fields(endpoint = %self.endpoint))]
    async fn mutate_async(self) -> Result<T::Response, ApiError<T::Error>> {
        let response = self.call_async().await?;
        if let Some(cache) = &self.inner.cache
            && !self.tags.is_empty()
        {
            self.recover(
                "invalidate",
                cache.ainvalidate_tags(&self.endpoint, &self.tags).await,
            )?;
            metrics::record_invalidation(&self.endpoint, self.tags.len());
            debug!(tags = self.tags.len(), "Invalidated tags");
        }
        Ok(response)
    }
}

/// Setup phase of an [`Api`].
///
/// ```
/// use querybox::{Api, Cache};
/// use querybox_core::{Provides, Tag, Transport};
/// use querybox_memory::MemoryBackend;
///
/// struct Echo;
///
/// #[async_trait::async_trait]
/// impl Transport<String> for Echo {
///     type Response = String;
///     type Error = std::io::Error;
///
///     fn call(&self, _endpoint: &str, request: &String) -> Result<String, std::io::Error> {
///         Ok(request.clone())
///     }
///
///     async fn call_async(&self, endpoint: &str, request: &String) -> Result<String, std::io::Error> {
///         self.call(endpoint, request)
///     }
/// }
///
/// let api = Api::<String, _>::builder(Echo)
///     .cache(Cache::new(MemoryBackend::new()))
///     .query("getItem", |id: &u64| {
///         Provides::tagged(format!("/items/{id}"), Tag::instance("Item", id))
///     })
///     .mutation("updateItem", |id: &u64| {
///         Provides::tagged(format!("/items/{id}"), Tag::instance("Item", id))
///     })
///     .build();
///
/// assert_eq!(api.query("getItem", &42u64).unwrap(), "/items/42");
/// assert!(api.mutate("updateItem", &42u64).is_ok());
/// ```
pub struct ApiBuilder<Req, T> {
    transport: T,
    registry: Registry<Req>,
    cache: Option<Cache>,
    config: ApiConfig,
}

impl<Req, T> ApiBuilder<Req, T>
where
    Req: Send + Sync + 'static,
    T: Transport<Req>,
{
    /// Creates a builder with no endpoints, no cache and default settings.
    pub fn new(transport: T) -> Self {
        ApiBuilder {
            transport,
            registry: Registry::new(),
            cache: None,
            config: ApiConfig::default(),
        }
    }

    /// Caches query responses in `cache`.
    pub fn cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Caches query responses in a new [`Cache`] over `backend`.
    pub fn backend<B>(self, backend: B) -> Self
    where
        B: Backend + 'static,
    {
        self.cache(Cache::new(backend))
    }

    /// Replaces the configuration.
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a query.
    pub fn query<A, F>(self, name: impl Into<SmolStr>, builder: F) -> Self
    where
        A: Any,
        F: Fn(&A) -> Provides<Req, A> + Send + Sync + 'static,
    {
        self.register(name, EndpointMode::Query, EndpointOptions::default(), builder)
    }

    /// Registers a query with options.
    pub fn query_with<A, F>(
        self,
        name: impl Into<SmolStr>,
        options: EndpointOptions,
        builder: F,
    ) -> Self
    where
        A: Any,
        F: Fn(&A) -> Provides<Req, A> + Send + Sync + 'static,
    {
        self.register(name, EndpointMode::Query, options, builder)
    }

    /// Registers a mutation.
    pub fn mutation<A, F>(self, name: impl Into<SmolStr>, builder: F) -> Self
    where
        A: Any,
        F: Fn(&A) -> Provides<Req, A> + Send + Sync + 'static,
    {
        self.register(
            name,
            EndpointMode::Mutation,
            EndpointOptions::default(),
            builder,
        )
    }

    /// Registers a mutation with options.
    pub fn mutation_with<A, F>(
        self,
        name: impl Into<SmolStr>,
        options: EndpointOptions,
        builder: F,
    ) -> Self
    where
        A: Any,
        F: Fn(&A) -> Provides<Req, A> + Send + Sync + 'static,
    {
        self.register(name, EndpointMode::Mutation, options, builder)
    }

    /// Registers an endpoint. A later registration under the same name
    /// replaces this one.
    pub fn register<A, F>(
        mut self,
        name: impl Into<SmolStr>,
        mode: EndpointMode,
        options: EndpointOptions,
        builder: F,
    ) -> Self
    where
        A: Any,
        F: Fn(&A) -> Provides<Req, A> + Send + Sync + 'static,
    {
        self.registry.register(name, mode, options, builder);
        self
    }

    /// Finishes setup.
    pub fn build(self) -> Api<Req, T> {
        let offload = OffloadManager::new(OffloadConfig::from(&self.config.offload));
        Api {
            inner: Arc::new(Inner {
                transport: self.transport,
                registry: self.registry,
                cache: self.cache,
                config: self.config,
                offload,
            }),
        }
    }
}
