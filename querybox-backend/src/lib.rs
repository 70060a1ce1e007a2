//! Backend contract for the querybox tag cache.
//!
//! A backend is a plain key/value store with per-entry time-to-live. It
//! knows nothing about requests, tags or endpoints; the `Cache` in the
//! `querybox` crate layers that scheme on top. If you want to plug in your
//! own storage, implement [`Backend`].
mod backend;
mod error;
pub mod fanout;
pub mod format;

pub use backend::{Backend, BackendResult, DeleteStatus};
pub use error::BackendError;
pub use format::{FormatError, JsonFormat};
pub use querybox_core::{CacheKey, Raw};
