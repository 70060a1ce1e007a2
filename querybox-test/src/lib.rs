//! Test support for querybox.
//!
//! - [`MockTransport`](transport::MockTransport) answers every request with
//!   a JSON document and counts calls per endpoint and per mode.
//! - [`CountingBackend`](backend::CountingBackend) counts backend operations.
//! - [`ErrorBackend`](backend::ErrorBackend) fails selected operations on
//!   demand.
//! - [`capture`](crate::tracing::capture) records log events for assertions.

pub mod backend;
pub mod tracing;
pub mod transport;

pub use backend::{BackendCounters, CountingBackend, ErrorBackend};
pub use transport::{Method, MockError, MockTransport, Request};
