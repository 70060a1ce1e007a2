//! Stored entry with expiry metadata.

use std::time::Duration;

use chrono::{DateTime, Utc};
use querybox_core::Raw;

/// A value as held by [`MemoryBackend`](crate::MemoryBackend).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    value: Raw,
    ttl: Option<Duration>,
    created_at: DateTime<Utc>,
    expire: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// Creates an entry written at `created_at`.
    ///
    /// A zero `ttl` is normalized to `None`. A `ttl` too large to represent
    /// as a timestamp also never expires.
    pub fn new(value: Raw, ttl: Option<Duration>, created_at: DateTime<Utc>) -> Self {
        let ttl = ttl.filter(|ttl| !ttl.is_zero());
        let expire = ttl.and_then(|ttl| {
            chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|delta| created_at.checked_add_signed(delta))
        });
        CacheEntry {
            value,
            ttl,
            created_at,
            expire,
        }
    }

    /// Returns the stored bytes.
    #[inline]
    pub fn value(&self) -> &Raw {
        &self.value
    }

    /// Returns the time-to-live the entry was written with.
    #[inline]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Returns when the entry was written.
    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the entry stops being readable, if ever.
    #[inline]
    pub fn expire(&self) -> Option<DateTime<Utc>> {
        self.expire
    }

    /// Returns `true` once `created_at + ttl` lies strictly before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expire.is_some_and(|expire| expire < now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_no_ttl_never_expires() {
        let entry = CacheEntry::new(Raw::from_static(b"v"), None, at(0));
        assert!(!entry.is_expired_at(at(i32::MAX as i64)));
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let entry = CacheEntry::new(Raw::from_static(b"v"), Some(Duration::ZERO), at(0));
        assert_eq!(entry.ttl(), None);
        assert!(!entry.is_expired_at(at(1_000_000)));
    }

    #[test]
    fn test_expiry_boundary_is_strict() {
        let entry = CacheEntry::new(Raw::from_static(b"v"), Some(Duration::from_secs(1)), at(10));
        assert!(!entry.is_expired_at(at(11)));
        assert!(entry.is_expired_at(at(12)));
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let entry = CacheEntry::new(Raw::from_static(b"v"), Some(Duration::MAX), at(0));
        assert_eq!(entry.expire(), None);
        assert!(!entry.is_expired_at(at(i32::MAX as i64)));
    }
}
