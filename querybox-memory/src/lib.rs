//! In-process reference backend for querybox.
//!
//! [`MemoryBackend`] keeps entries in a sharded concurrent map. Expiry is
//! checked lazily: an entry past its time-to-live is evicted by the read
//! that finds it, never by a background sweep.
//!
//! ```
//! use std::time::Duration;
//! use querybox_backend::{Backend, CacheKey};
//! use querybox_memory::MemoryBackend;
//!
//! let backend = MemoryBackend::builder().name("local").build();
//! let key = CacheKey::new("greeting");
//! backend.blocking_write(&key, "hello".into(), Some(Duration::from_secs(60))).unwrap();
//! assert_eq!(backend.blocking_read(&key).unwrap().as_deref(), Some(&b"hello"[..]));
//! ```
#![warn(missing_docs)]

mod backend;
mod builder;
mod entry;

pub use backend::MemoryBackend;
pub use builder::MemoryBackendBuilder;
pub use entry::CacheEntry;
