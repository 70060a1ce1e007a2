#![warn(missing_docs)]
//! # querybox-core
//!
//! Core types for the querybox request dispatch framework.
//!
//! This crate holds the pieces every other querybox crate agrees on and
//! performs no I/O of its own:
//!
//! - [`Tag`] and [`TagSet`] label cached responses for bulk invalidation
//! - [`CacheKey`] derives backend keys from requests and tags
//! - [`EndpointMode`], [`RequestDef`] and [`Provides`] describe what a
//!   request builder produces
//! - [`Transport`] is the seam to whatever actually performs a request
//! - [`Cacheable`] bounds values that can round-trip through a cache backend
//!
//! ## Key Layout
//!
//! ```
//! use querybox_core::{CacheKey, Tag};
//!
//! let key = CacheKey::for_request("getItem", &serde_json::json!({"id": 42})).unwrap();
//! assert_eq!(key.as_str(), r#"getItem/{"id":42}"#);
//!
//! let tag_key = CacheKey::for_tag(&Tag::new("Item", Some("42")));
//! assert_eq!(tag_key.as_str(), "tags/Item:42");
//! ```

pub mod cacheable;
pub mod endpoint;
mod finite;
pub mod key;
pub mod tag;
pub mod transport;

pub use cacheable::Cacheable;
pub use endpoint::{EndpointMode, Provides, RequestDef, TagFn};
pub use key::{CacheKey, KeyError, canonical_json};
pub use tag::{Tag, TagSet};
pub use transport::Transport;

#[doc(hidden)]
pub use smol_str::SmolStr;

/// Raw byte data type used for serialized cache values.
/// Using `Bytes` provides cheap cloning via reference counting.
pub type Raw = bytes::Bytes;
