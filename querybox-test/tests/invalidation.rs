//! Mutations and tag-based invalidation.

mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;
use querybox::{ApiConfig, Tag, TagSet};
use querybox_memory::MemoryBackend;
use querybox_test::{CountingBackend, MockTransport};
use serde_json::Value;

use common::{ItemUpdate, item_request, items_api};

#[test]
fn test_mutation_invalidates_cached_query() {
    let api = items_api(MockTransport::new(), MemoryBackend::new(), ApiConfig::default());

    let before = api.query("getItem", &42u64).unwrap();
    api.mutate("updateItem", &ItemUpdate::new(42, "renamed")).unwrap();
    let after = api.query("getItem", &42u64).unwrap();

    assert_ne!(before["call"], after["call"]);
    assert_eq!(api.transport().calls_to("getItem"), 2);
    assert_eq!(api.transport().calls_to("updateItem"), 1);
}

#[test]
fn test_mutation_only_invalidates_its_own_tags() {
    let api = items_api(MockTransport::new(), MemoryBackend::new(), ApiConfig::default());

    api.query("getItem", &1u64).unwrap();
    api.query("getItem", &2u64).unwrap();
    api.mutate("updateItem", &ItemUpdate::new(1, "renamed")).unwrap();
    api.query("getItem", &1u64).unwrap();
    api.query("getItem", &2u64).unwrap();

    assert_eq!(api.transport().calls_to("getItem"), 3);
}

#[test]
fn test_mutations_are_never_served_from_cache() {
    let api = items_api(MockTransport::new(), MemoryBackend::new(), ApiConfig::default());
    let update = ItemUpdate::new(5, "same");

    let first = api.mutate("updateItem", &update).unwrap();
    let second = api.mutate("updateItem", &update).unwrap();

    assert_ne!(first["call"], second["call"]);
    assert_eq!(api.transport().calls_to("updateItem"), 2);
}

#[tokio::test]
async fn test_async_mutation_invalidates_cached_query() {
    let api = items_api(MockTransport::new(), MemoryBackend::new(), ApiConfig::default());

    api.query_async("getItem", &42u64).unwrap().await.unwrap();
    api.mutate_async("updateItem", &ItemUpdate::new(42, "renamed"))
        .unwrap()
        .await
        .unwrap();
    api.query_async("getItem", &42u64).unwrap().await.unwrap();

    assert_eq!(api.transport().calls_to("getItem"), 2);
}

#[tokio::test]
async fn test_dropped_async_mutation_still_invalidates() {
    let transport = MockTransport::new().delay(Duration::from_millis(20));
    let api = items_api(transport, MemoryBackend::new(), ApiConfig::default());
    api.query("getItem", &42u64).unwrap();

    drop(
        api.mutate_async("updateItem", &ItemUpdate::new(42, "renamed"))
            .unwrap(),
    );
    assert_eq!(api.active_dispatches(), 1);

    api.wait_idle().await;

    assert_eq!(api.active_dispatches(), 0);
    assert_eq!(api.transport().calls_to("updateItem"), 1);
    let cached = api
        .cache()
        .unwrap()
        .get_by_request::<_, Value>("getItem", &item_request(42))
        .unwrap();
    assert_eq!(cached, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_many_detached_dispatches_settle() {
    let api = items_api(MockTransport::new(), MemoryBackend::new(), ApiConfig::default());

    for id in 0..16u64 {
        drop(api.query_async("getItem", &id).unwrap());
    }
    api.wait_idle().await;

    for id in 0..16u64 {
        api.query("getItem", &id).unwrap();
    }
    assert_eq!(api.transport().calls_to("getItem"), 16);
}

#[test]
fn test_invalidation_only_reaches_latest_request_per_tag() {
    let api = items_api(MockTransport::new(), MemoryBackend::new(), ApiConfig::default());

    // Both pages carry the static `Items` tag; page 2 is written last.
    api.query("listItems", &1u32).unwrap();
    api.query("listItems", &2u32).unwrap();
    api.mutate("createItem", &"new item".to_owned()).unwrap();

    api.query("listItems", &2u32).unwrap();
    assert_eq!(api.transport().calls_to("listItems"), 3);

    // Page 1 was superseded in the tag index and is still served from cache.
    api.query("listItems", &1u32).unwrap();
    assert_eq!(api.transport().calls_to("listItems"), 3);
}

#[test]
fn test_get_by_tags_returns_the_tagged_response() {
    let api = items_api(MockTransport::new(), MemoryBackend::new(), ApiConfig::default());
    let cache = api.cache().unwrap();
    let tags = TagSet::from(Tag::instance("Item", 42));

    let response = api.query("getItem", &42u64).unwrap();
    assert_eq!(
        cache.get_by_tags::<Value>("getItem", &tags).unwrap(),
        Some(response)
    );

    api.mutate("updateItem", &ItemUpdate::new(42, "renamed")).unwrap();
    assert_eq!(cache.get_by_tags::<Value>("getItem", &tags).unwrap(), None);
}

#[test]
fn test_mutation_without_tags_leaves_cache_alone() {
    let backend = CountingBackend::new();
    let api = items_api(MockTransport::new(), backend.clone(), ApiConfig::default());
    api.query("getItem", &42u64).unwrap();
    backend.counters.reset();

    api.mutate("ping", &()).unwrap();

    assert_eq!(backend.read_count(), 0);
    assert_eq!(backend.remove_count(), 0);
    assert_eq!(api.transport().calls_to("ping"), 1);
}

#[test]
fn test_query_writes_primary_and_tag_entries() {
    let backend = CountingBackend::new();
    let api = items_api(MockTransport::new(), backend.clone(), ApiConfig::default());

    api.query("getItem", &42u64).unwrap();

    assert_eq!(backend.read_count(), 1);
    assert_eq!(backend.write_count(), 2);
}

#[test]
fn test_failed_mutation_does_not_invalidate() {
    let backend = CountingBackend::new();
    let api = items_api(MockTransport::new(), backend.clone(), ApiConfig::default());
    api.query("getItem", &42u64).unwrap();
    api.transport().fail_next(1);

    assert!(api.mutate("updateItem", &ItemUpdate::new(42, "x")).is_err());

    assert_eq!(backend.remove_count(), 0);
    api.query("getItem", &42u64).unwrap();
    assert_eq!(api.transport().calls_to("getItem"), 1);
}
