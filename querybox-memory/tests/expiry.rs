//! Tests for read-triggered expiry and storage introspection.

use std::time::Duration;

use bytes::Bytes;
use querybox_backend::{Backend, DeleteStatus};
use querybox_core::CacheKey;
use querybox_memory::MemoryBackend;

fn key(id: u32) -> CacheKey {
    CacheKey::new(format!("getItem/{{\"id\":{id}}}"))
}

#[test]
fn test_round_trip_without_ttl() {
    let backend = MemoryBackend::new();
    let value = Bytes::from_static(b"{\"name\":\"one\"}");

    backend.blocking_write(&key(1), value.clone(), None).unwrap();

    assert_eq!(backend.blocking_read(&key(1)).unwrap(), Some(value));
    assert_eq!(backend.entry(&key(1)).unwrap().ttl(), None);
}

#[tokio::test]
async fn test_expired_entry_is_evicted_by_read() {
    let backend = MemoryBackend::new();
    backend
        .write(&key(1), Bytes::from_static(b"v"), Some(Duration::from_millis(50)))
        .await
        .unwrap();
    assert_eq!(backend.len(), 1);

    tokio::time::sleep(Duration::from_millis(120)).await;

    // Expiry is lazy: the entry is still stored until someone reads it.
    assert!(backend.contains(&key(1)));
    assert_eq!(backend.read(&key(1)).await.unwrap(), None);
    assert!(!backend.contains(&key(1)));
    assert!(backend.is_empty());
}

#[tokio::test]
async fn test_fresh_entry_survives_read() {
    let backend = MemoryBackend::new();
    backend
        .write(&key(1), Bytes::from_static(b"v"), Some(Duration::from_secs(60)))
        .await
        .unwrap();

    assert!(backend.read(&key(1)).await.unwrap().is_some());
    assert_eq!(backend.len(), 1);
}

#[test]
fn test_zero_ttl_never_expires() {
    let backend = MemoryBackend::new();
    backend
        .blocking_write(&key(1), Bytes::from_static(b"v"), Some(Duration::ZERO))
        .unwrap();

    std::thread::sleep(Duration::from_millis(20));

    assert!(backend.blocking_read(&key(1)).unwrap().is_some());
}

#[test]
fn test_rewrite_replaces_value_and_ttl() {
    let backend = MemoryBackend::new();
    backend
        .blocking_write(&key(1), Bytes::from_static(b"old"), Some(Duration::from_millis(10)))
        .unwrap();
    backend
        .blocking_write(&key(1), Bytes::from_static(b"new"), None)
        .unwrap();

    std::thread::sleep(Duration::from_millis(30));

    assert_eq!(
        backend.blocking_read(&key(1)).unwrap(),
        Some(Bytes::from_static(b"new"))
    );
    assert_eq!(backend.len(), 1);
}

#[tokio::test]
async fn test_remove_missing_key_is_not_an_error() {
    let backend = MemoryBackend::new();
    assert_eq!(backend.remove(&key(7)).await.unwrap(), DeleteStatus::Missing);
    assert_eq!(
        backend.blocking_remove(&key(7)).unwrap(),
        DeleteStatus::Missing
    );
}

#[tokio::test]
async fn test_blocking_and_async_share_storage() {
    let backend = MemoryBackend::new();
    backend
        .blocking_write(&key(1), Bytes::from_static(b"v"), None)
        .unwrap();

    assert!(backend.read(&key(1)).await.unwrap().is_some());
    assert_eq!(backend.remove(&key(1)).await.unwrap(), DeleteStatus::Deleted(1));
    assert_eq!(backend.blocking_read(&key(1)).unwrap(), None);
}

#[test]
fn test_clones_share_storage() {
    let backend = MemoryBackend::builder().name("shared").build();
    let clone = backend.clone();
    clone
        .blocking_write(&key(1), Bytes::from_static(b"v"), None)
        .unwrap();

    assert!(backend.contains(&key(1)));
    backend.clear();
    assert!(clone.is_empty());
    assert_eq!(clone.name(), "shared");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers() {
    let backend = MemoryBackend::new();
    let tasks = (0..64).map(|id| {
        let backend = backend.clone();
        tokio::spawn(async move {
            backend
                .write(&key(id), Bytes::from(id.to_string()), None)
                .await
        })
    });

    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }
    assert_eq!(backend.len(), 64);
}
