//! Builder for configuring [`MemoryBackend`].

use std::sync::Arc;

use dashmap::DashMap;
use smol_str::SmolStr;

use crate::backend::MemoryBackend;

const DEFAULT_NAME: &str = "memory";

/// Builder for [`MemoryBackend`].
///
/// ```
/// use querybox_backend::Backend;
/// use querybox_memory::MemoryBackend;
///
/// let backend = MemoryBackend::builder()
///     .name("l1")
///     .initial_capacity(1024)
///     .build();
/// assert_eq!(backend.name(), "l1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBackendBuilder {
    name: Option<SmolStr>,
    initial_capacity: Option<usize>,
}

impl MemoryBackendBuilder {
    /// Sets the name used in logs and metrics. Defaults to `"memory"`.
    pub fn name(mut self, name: impl Into<SmolStr>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Pre-allocates room for `capacity` entries.
    ///
    /// This is not a limit: the backend never evicts because of size.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Builds the backend.
    pub fn build(self) -> MemoryBackend {
        let store = match self.initial_capacity {
            Some(capacity) => DashMap::with_capacity(capacity),
            None => DashMap::new(),
        };
        MemoryBackend {
            store: Arc::new(store),
            name: self.name.unwrap_or_else(|| SmolStr::new_static(DEFAULT_NAME)),
        }
    }
}
