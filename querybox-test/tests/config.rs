//! Loading an api configuration from YAML and applying it.

mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;
use querybox::{Api, ApiConfig, BackendErrorPolicy, CacheKey, EndpointOptions, Provides, Tag};
use querybox_memory::MemoryBackend;
use querybox_test::{ErrorBackend, MockTransport, Request};
use tracing::Level;

use common::{item_request, items_api};

#[test]
fn test_yaml_ttl_is_applied_to_cache_entries() {
    let config = ApiConfig::from_yaml("cache:\n  ttl: 90s\n").unwrap();
    let backend = MemoryBackend::new();
    let api = items_api(MockTransport::new(), backend.clone(), config);

    api.query("getItem", &42u64).unwrap();

    let primary = api
        .cache()
        .unwrap()
        .primary_key("getItem", &item_request(42))
        .unwrap();
    let tag = CacheKey::for_tag(&Tag::instance("Item", 42));
    assert_eq!(backend.entry(&primary).unwrap().ttl(), Some(Duration::from_secs(90)));
    assert_eq!(backend.entry(&tag).unwrap().ttl(), Some(Duration::from_secs(90)));
}

#[test]
fn test_endpoint_ttl_overrides_config() {
    let config = ApiConfig::from_yaml("cache:\n  ttl: 90s\n").unwrap();
    let backend = MemoryBackend::new();
    let api: Api<Request, MockTransport> = Api::builder(MockTransport::new())
        .backend(backend.clone())
        .config(config)
        .query_with(
            "getItem",
            EndpointOptions::new().ttl(Duration::from_secs(5)),
            |id: &u64| Provides::request(item_request(*id)),
        )
        .build();

    api.query("getItem", &1u64).unwrap();

    let key = api
        .cache()
        .unwrap()
        .primary_key("getItem", &item_request(1))
        .unwrap();
    assert_eq!(backend.entry(&key).unwrap().ttl(), Some(Duration::from_secs(5)));
}

#[test]
fn test_unparsable_ttl_is_an_error() {
    assert!(ApiConfig::from_yaml("cache:\n  ttl: forever\n").is_err());
}

#[test]
fn test_yaml_error_policy_is_applied() {
    let config = ApiConfig::from_yaml("cache:\n  on_backend_error: FailClosed\n").unwrap();
    let api = items_api(MockTransport::new(), ErrorBackend::broken(), config);

    assert!(api.query("getItem", &42u64).is_err());
    assert_eq!(api.transport().calls(), 0);
}

#[tokio::test(flavor = "current_thread")]
async fn test_slow_dispatch_is_reported() {
    let (events, _guard) = querybox_test::tracing::capture();
    let config = ApiConfig::from_yaml("offload:\n  warn_after: 1ms\n").unwrap();
    let transport = MockTransport::new().delay(Duration::from_millis(30));
    let api = items_api(transport, MemoryBackend::new(), config);

    api.mutate_async("ping", &()).unwrap().await.unwrap();

    let warnings = events.at_level(Level::WARN);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("exceeded timeout threshold"));
}

#[tokio::test(flavor = "current_thread")]
async fn test_fast_dispatch_is_not_reported() {
    let (events, _guard) = querybox_test::tracing::capture();
    let config = ApiConfig::default().warn_after(Duration::from_secs(60));
    let api = items_api(MockTransport::new(), MemoryBackend::new(), config);

    api.mutate_async("ping", &()).unwrap().await.unwrap();

    assert!(events.at_level(Level::WARN).is_empty());
}
