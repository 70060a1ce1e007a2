//! Transport seam.
//!
//! The dispatch engine never performs I/O itself. Whatever actually sends a
//! request (an HTTP client, a JSON-RPC envelope builder, an in-process fake)
//! implements [`Transport`] for the request descriptor type it understands.

use std::sync::Arc;

use async_trait::async_trait;

/// Performs requests on behalf of the dispatch engine.
///
/// Implementations own whatever configuration they need (base URL, header
/// preparation, credentials). Both forms must reject transport-level
/// failures, such as a non-success status, with `Err` rather than returning
/// a response that looks successful: the engine caches every `Ok` response
/// it receives from a query.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use querybox_core::Transport;
///
/// struct Echo;
///
/// #[async_trait]
/// impl Transport<String> for Echo {
///     type Response = String;
///     type Error = std::io::Error;
///
///     fn call(&self, endpoint: &str, request: &String) -> Result<String, Self::Error> {
///         Ok(format!("{endpoint}: {request}"))
///     }
///
///     async fn call_async(&self, endpoint: &str, request: &String) -> Result<String, Self::Error> {
///         self.call(endpoint, request)
///     }
/// }
///
/// assert_eq!(Echo.call("ping", &"hi".to_owned()).unwrap(), "ping: hi");
/// ```
#[async_trait]
pub trait Transport<Req>: Send + Sync
where
    Req: Send + Sync,
{
    /// Response produced by a successful call.
    type Response: Send;
    /// Transport-level failure, handed to callers unchanged.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Performs the request, blocking the calling thread until it completes.
    fn call(&self, endpoint: &str, request: &Req) -> Result<Self::Response, Self::Error>;

    /// Performs the request without blocking the calling thread.
    async fn call_async(&self, endpoint: &str, request: &Req)
    -> Result<Self::Response, Self::Error>;
}

#[async_trait]
impl<Req, T> Transport<Req> for Arc<T>
where
    Req: Send + Sync,
    T: Transport<Req> + ?Sized,
{
    type Response = T::Response;
    type Error = T::Error;

    fn call(&self, endpoint: &str, request: &Req) -> Result<Self::Response, Self::Error> {
        (**self).call(endpoint, request)
    }

    async fn call_async(
        &self,
        endpoint: &str,
        request: &Req,
    ) -> Result<Self::Response, Self::Error> {
        (**self).call_async(endpoint, request).await
    }
}
