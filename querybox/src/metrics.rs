//! Metrics declaration and recording.
//!
//! With the `metrics` feature disabled every `record_*` function is an empty
//! inline function and compiles away.

#[cfg(feature = "metrics")]
use std::time::Duration;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of query cache hits.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "querybox_cache_hit_total",
            "Total number of query cache hits."
        );
        "querybox_cache_hit_total"
    };
    /// Track number of query cache misses.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "querybox_cache_miss_total",
            "Total number of query cache misses."
        );
        "querybox_cache_miss_total"
    };
    /// Track number of failed transport calls.
    pub static ref TRANSPORT_ERROR_COUNTER: &'static str = {
        metrics::describe_counter!(
            "querybox_transport_error_total",
            "Total number of failed transport calls."
        );
        "querybox_transport_error_total"
    };
    /// Track number of cache backend failures seen by dispatch.
    pub static ref BACKEND_ERROR_COUNTER: &'static str = {
        metrics::describe_counter!(
            "querybox_backend_error_total",
            "Total number of cache backend failures."
        );
        "querybox_backend_error_total"
    };
    /// Track number of tags invalidated by mutations.
    pub static ref INVALIDATED_TAGS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "querybox_invalidated_tags_total",
            "Total number of tags invalidated by mutations."
        );
        "querybox_invalidated_tags_total"
    };
    /// Track number of async dispatches in flight.
    pub static ref DISPATCH_TASKS_ACTIVE: &'static str = {
        metrics::describe_gauge!(
            "querybox_dispatch_tasks_active",
            "Number of async dispatches currently running."
        );
        "querybox_dispatch_tasks_active"
    };
    /// Histogram of transport call duration.
    pub static ref TRANSPORT_DURATION: &'static str = {
        metrics::describe_histogram!(
            "querybox_transport_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of transport calls in seconds."
        );
        "querybox_transport_duration_seconds"
    };
}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_cache_lookup(endpoint: &str, hit: bool) {
    let counter = if hit {
        *CACHE_HIT_COUNTER
    } else {
        *CACHE_MISS_COUNTER
    };
    metrics::counter!(counter, "endpoint" => endpoint.to_owned()).increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_cache_lookup(_endpoint: &str, _hit: bool) {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_transport(endpoint: &str, duration: Duration, ok: bool) {
    metrics::histogram!(*TRANSPORT_DURATION, "endpoint" => endpoint.to_owned())
        .record(duration.as_secs_f64());
    if !ok {
        metrics::counter!(*TRANSPORT_ERROR_COUNTER, "endpoint" => endpoint.to_owned())
            .increment(1);
    }
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_transport(_endpoint: &str, _duration: std::time::Duration, _ok: bool) {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_backend_error(endpoint: &str, operation: &'static str) {
    metrics::counter!(
        *BACKEND_ERROR_COUNTER,
        "endpoint" => endpoint.to_owned(),
        "operation" => operation
    )
    .increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_backend_error(_endpoint: &str, _operation: &'static str) {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_invalidation(endpoint: &str, tags: usize) {
    metrics::counter!(*INVALIDATED_TAGS_COUNTER, "endpoint" => endpoint.to_owned())
        .increment(tags as u64);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_invalidation(_endpoint: &str, _tags: usize) {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_task_spawned(endpoint: &str) {
    metrics::gauge!(*DISPATCH_TASKS_ACTIVE, "endpoint" => endpoint.to_owned()).increment(1.0);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_task_spawned(_endpoint: &str) {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_task_completed(endpoint: &str) {
    metrics::gauge!(*DISPATCH_TASKS_ACTIVE, "endpoint" => endpoint.to_owned()).decrement(1.0);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_task_completed(_endpoint: &str) {}
