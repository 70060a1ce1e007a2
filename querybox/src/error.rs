use querybox_backend::BackendError;
use querybox_core::{EndpointMode, KeyError};
use smol_str::SmolStr;
use thiserror::Error;
use tokio::task::JoinError;

/// Error of a single dispatch.
///
/// `E` is the error type of the [`Transport`](querybox_core::Transport)
/// the [`Api`](crate::Api) was built with. Transport failures are carried
/// unchanged in [`ApiError::Transport`].
#[derive(Debug, Error)]
pub enum ApiError<E> {
    /// No endpoint is registered under this name.
    #[error("endpoint `{name}` is not registered")]
    EndpointNotFound {
        /// Requested endpoint name.
        name: SmolStr,
    },

    /// The endpoint exists but was registered under the other mode.
    #[error("endpoint `{name}` is a {actual}, called as a {expected}")]
    ModeMismatch {
        /// Requested endpoint name.
        name: SmolStr,
        /// Mode of the dispatch path that was called.
        expected: EndpointMode,
        /// Mode the endpoint was registered with.
        actual: EndpointMode,
    },

    /// The call arguments do not have the type the request builder takes.
    #[error("endpoint `{name}` expects arguments of type `{expected}`")]
    ArgumentType {
        /// Requested endpoint name.
        name: SmolStr,
        /// Argument type of the registered builder.
        expected: &'static str,
    },

    /// The request could not be turned into a cache key.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// The transport failed to perform the request.
    #[error("transport failed: {0}")]
    Transport(#[source] E),

    /// The cache backend failed and the api propagates backend errors.
    #[error("cache backend failed: {0}")]
    Backend(#[source] BackendError),

    /// An async dispatch was started outside of a Tokio runtime.
    #[error("async dispatch requires a running Tokio runtime")]
    NoRuntime,

    /// The task running an async dispatch panicked.
    #[error("dispatch task failed: {0}")]
    TaskFailed(#[source] JoinError),
}

impl<E> ApiError<E> {
    /// Returns `true` for errors raised before any I/O because of how the
    /// api was set up or called. These are never worth retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ApiError::EndpointNotFound { .. }
                | ApiError::ModeMismatch { .. }
                | ApiError::ArgumentType { .. }
                | ApiError::NoRuntime
        )
    }

    /// Returns the transport error, if this is one.
    pub fn as_transport(&self) -> Option<&E> {
        match self {
            ApiError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl<E> From<CacheError> for ApiError<E> {
    fn from(error: CacheError) -> Self {
        match error {
            CacheError::Key(err) => ApiError::Key(err),
            CacheError::Backend(err) => ApiError::Backend(err),
        }
    }
}

/// Error of a [`Cache`](crate::Cache) operation.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The request could not be turned into a cache key.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// The backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Error loading an [`ApiConfig`](crate::config::ApiConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid YAML or does not match the schema.
    #[error("invalid api configuration: {0}")]
    Parse(#[from] serde_saphyr::Error),
}
