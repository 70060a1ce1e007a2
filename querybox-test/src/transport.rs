//! Scriptable in-process transport.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use querybox_core::Transport;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// Minimal request descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: Method,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Request {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Request {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Request {
            method: Method::Put,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Request {
            method: Method::Delete,
            path: path.into(),
            body: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum MockError {
    #[error("scripted failure calling `{endpoint}`")]
    Scripted { endpoint: String },
}

type Responder = Arc<dyn Fn(&str, &Request, usize) -> Value + Send + Sync>;

/// Transport that answers in-process and records every call.
///
/// By default the response echoes the endpoint and path together with the
/// sequence number of the call, so a refetch is always distinguishable from
/// a cached answer.
#[derive(Clone)]
pub struct MockTransport {
    responder: Responder,
    delay: Option<Duration>,
    failures: Arc<AtomicUsize>,
    sync_calls: Arc<AtomicUsize>,
    async_calls: Arc<AtomicUsize>,
    per_endpoint: Arc<DashMap<String, usize>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::with_responder(|endpoint, request, call| {
            json!({
                "endpoint": endpoint,
                "path": request.path,
                "call": call,
            })
        })
    }

    /// Answers with `responder(endpoint, request, call number)`.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&str, &Request, usize) -> Value + Send + Sync + 'static,
    {
        MockTransport {
            responder: Arc::new(responder),
            delay: None,
            failures: Arc::new(AtomicUsize::new(0)),
            sync_calls: Arc::new(AtomicUsize::new(0)),
            async_calls: Arc::new(AtomicUsize::new(0)),
            per_endpoint: Arc::new(DashMap::new()),
        }
    }

    /// Delays every async call by `delay`.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes the next `n` calls fail.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Total number of calls, both modes.
    pub fn calls(&self) -> usize {
        self.sync_calls() + self.async_calls()
    }

    pub fn sync_calls(&self) -> usize {
        self.sync_calls.load(Ordering::SeqCst)
    }

    pub fn async_calls(&self) -> usize {
        self.async_calls.load(Ordering::SeqCst)
    }

    /// Number of calls made for `endpoint`, both modes.
    pub fn calls_to(&self, endpoint: &str) -> usize {
        self.per_endpoint.get(endpoint).map_or(0, |count| *count)
    }

    fn respond(&self, endpoint: &str, request: &Request) -> Result<Value, MockError> {
        let call = {
            let mut count = self.per_endpoint.entry(endpoint.to_owned()).or_insert(0);
            *count += 1;
            self.calls()
        };
        let scripted = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if scripted {
            return Err(MockError::Scripted {
                endpoint: endpoint.to_owned(),
            });
        }
        Ok((self.responder)(endpoint, request, call))
    }
}

#[async_trait]
impl Transport<Request> for MockTransport {
    type Response = Value;
    type Error = MockError;

    fn call(&self, endpoint: &str, request: &Request) -> Result<Value, MockError> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(endpoint, request)
    }

    async fn call_async(&self, endpoint: &str, request: &Request) -> Result<Value, MockError> {
        self.async_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.respond(endpoint, request)
    }
}
