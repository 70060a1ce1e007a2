#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! # querybox
//!
//! Typed api clients with request caching and tag-based invalidation.
//!
//! An [`Api`] owns a set of named endpoints. Each endpoint is a request
//! builder (a function from call arguments to a request, optionally with
//! tags) registered as either a query or a mutation:
//!
//! - a **query** is answered from the [`Cache`] when possible; otherwise its
//!   request goes through the [`Transport`] and the response is cached under
//!   the request and under each of its tags;
//! - a **mutation** always goes through the transport and then invalidates
//!   the responses its tags point at.
//!
//! Transports and cache backends are pluggable through the
//! [`Transport`] and [`Backend`](querybox_backend::Backend) traits.
//!
//! ## Blocking and async dispatch
//!
//! [`Api::query`] and [`Api::mutate`] block the caller. [`Api::query_async`]
//! and [`Api::mutate_async`] spawn the whole dispatch onto the current Tokio
//! runtime and return a [`DispatchHandle`]. The dispatch runs whether or not
//! the handle is awaited, so a dropped mutation still invalidates its tags.
//! [`Api::wait_idle`] waits for every such dispatch.

/// Tag-indexed response cache.
///
/// See [`Cache`] for the key layout and the tag index semantics.
pub mod cache;

/// Api configuration, loadable from YAML.
pub mod config;

/// Error types for dispatch, cache operations and configuration.
pub mod error;

/// Metrics collection for cache and dispatch observability.
///
/// When the `metrics` feature is enabled, this module provides counters,
/// a gauge and a histogram, all labelled by endpoint name:
/// - Query cache hits and misses
/// - Transport failures and call latency
/// - Backend failures and invalidated tags
/// - Async dispatches in flight
pub mod metrics;

/// Background execution of async dispatches.
pub mod offload;

/// Endpoint registry.
pub mod registry;

mod api;
mod handle;

pub use api::{Api, ApiBuilder};
pub use cache::Cache;
pub use config::{ApiConfig, BackendErrorPolicy};
pub use error::{ApiError, CacheError, ConfigError};
pub use handle::DispatchHandle;
pub use registry::{Endpoint, EndpointOptions, Registry};

pub use querybox_core::{
    CacheKey, Cacheable, EndpointMode, Provides, RequestDef, Tag, TagSet, Transport,
};
