//! Api configuration.
//!
//! Everything here can be built in code or loaded from YAML:
//!
//! ```
//! use std::time::Duration;
//! use querybox::config::{ApiConfig, BackendErrorPolicy};
//!
//! let config = ApiConfig::from_yaml(
//!     r#"
//! cache:
//!   ttl: 30s
//!   on_backend_error: FailClosed
//! offload:
//!   warn_after: 500ms
//! "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.cache.ttl, Some(Duration::from_secs(30)));
//! assert_eq!(config.cache.on_backend_error, BackendErrorPolicy::FailClosed);
//! assert_eq!(config.offload.warn_after, Some(Duration::from_millis(500)));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::offload::{OffloadConfig, TimeoutPolicy};

/// What dispatch does when the cache backend fails.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Default)]
pub enum BackendErrorPolicy {
    /// Failed reads count as misses; failed writes and invalidations are
    /// logged and dropped. The caller still gets the transport response.
    #[default]
    FailOpen,
    /// Backend errors are returned to the caller as
    /// [`ApiError::Backend`](crate::ApiError::Backend).
    FailClosed,
}

/// Cache behaviour of the dispatch engine.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Default)]
pub struct CacheSettings {
    /// Time-to-live of entries written by queries (e.g., "5s", "500ms", "1m").
    ///
    /// Absent or zero means entries never expire. Endpoint options override it.
    #[serde(default, with = "humantime_serde")]
    pub ttl: Option<Duration>,
    /// Backend error handling.
    #[serde(default)]
    pub on_backend_error: BackendErrorPolicy,
}

/// Async dispatch behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Default)]
pub struct OffloadSettings {
    /// Log a warning for async dispatches running longer than this.
    /// Slow dispatches are never cancelled.
    #[serde(default, with = "humantime_serde")]
    pub warn_after: Option<Duration>,
}

impl From<&OffloadSettings> for OffloadConfig {
    fn from(settings: &OffloadSettings) -> Self {
        let timeout_policy = match settings.warn_after {
            Some(duration) => TimeoutPolicy::Warn(duration),
            None => TimeoutPolicy::None,
        };
        OffloadConfig { timeout_policy }
    }
}

/// Top-level [`Api`](crate::Api) configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Default)]
pub struct ApiConfig {
    /// Cache behaviour.
    #[serde(default)]
    pub cache: CacheSettings,
    /// Async dispatch behaviour.
    #[serde(default)]
    pub offload: OffloadSettings,
}

impl ApiConfig {
    /// Parses a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_saphyr::from_str(yaml)?)
    }

    /// Sets the default time-to-live of cached responses.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl = Some(ttl);
        self
    }

    /// Sets the backend error policy.
    pub fn on_backend_error(mut self, policy: BackendErrorPolicy) -> Self {
        self.cache.on_backend_error = policy;
        self
    }

    /// Sets the slow async dispatch warning threshold.
    pub fn warn_after(mut self, duration: Duration) -> Self {
        self.offload.warn_after = Some(duration);
        self
    }
}
