//! Eager scheduling of async dispatches.
//!
//! An async dispatch is spawned onto the Tokio runtime as soon as it is
//! requested, so its cache side effects happen whether or not anyone awaits
//! the returned handle. The [`OffloadManager`] keeps track of those tasks so
//! callers can wait until every fire-and-forget dispatch has settled.

mod manager;
mod policy;

pub use manager::OffloadManager;
pub use policy::{OffloadConfig, TimeoutPolicy};
