use serde::{Serialize, de::DeserializeOwned};

/// Bound for responses that can be written to and read back from a cache.
///
/// Blanket-implemented for every `Serialize + DeserializeOwned + Send + Sync`
/// type, so response types only need the usual serde derives.
pub trait Cacheable: Serialize + DeserializeOwned + Send + Sync {}

impl<T> Cacheable for T where T: Serialize + DeserializeOwned + Send + Sync {}
