//! Cache key derivation.
//!
//! Two kinds of keys live side by side in one backend:
//!
//! | Kind | Format | Value stored under it |
//! |------|--------|-----------------------|
//! | Primary | `{endpoint}/{canonical request json}` | encoded response |
//! | Tag index | `tags/{tag}` | primary key of the latest response carrying the tag |
//!
//! Tag keys are not scoped by endpoint, so a mutation endpoint can
//! invalidate entries that a query endpoint wrote.
//!
//! ## Determinism
//!
//! Requests are serialized through [`serde_json::Value`], whose object maps
//! keep keys sorted. Two logically equal requests therefore produce the
//! same key even when they carry hash maps with different iteration order.
//! NaN and infinite floats have no JSON form and are rejected instead of
//! being written as `null`.
//!
//! A request key never lands in the tag namespace: an endpoint named `tags`
//! (or starting with `tags/`) is rejected.

use std::fmt;

use serde::Serialize;
use serde::ser::Error as _;
use smol_str::SmolStr;
use thiserror::Error;

use crate::Tag;
use crate::finite;

const TAG_NAMESPACE: &str = "tags";
const SEPARATOR: char = '/';

/// Error produced when a request descriptor cannot be turned into a key.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The request descriptor failed to serialize.
    #[error("request for endpoint `{endpoint}` is not serializable: {source}")]
    Serialize {
        /// Endpoint the request was built for.
        endpoint: SmolStr,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// The endpoint name would put the request key in the tag namespace.
    #[error("endpoint name `{endpoint}` is reserved for the tag index")]
    ReservedEndpoint {
        /// Offending endpoint name.
        endpoint: SmolStr,
    },
}

/// Serializes a value to canonical JSON with sorted object keys.
///
/// Fails on NaN and infinite floats.
pub fn canonical_json<T>(value: &T) -> Result<String, serde_json::Error>
where
    T: Serialize + ?Sized,
{
    finite::check(value).map_err(serde_json::Error::custom)?;
    let value = serde_json::to_value(value)?;
    serde_json::to_string(&value)
}

/// A backend key.
///
/// Cloning is cheap: short keys are stored inline and long keys are
/// reference counted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(SmolStr);

impl CacheKey {
    /// Wraps an already formatted key.
    pub fn new(raw: impl Into<SmolStr>) -> Self {
        CacheKey(raw.into())
    }

    /// Derives the primary key for a request sent to `endpoint`.
    pub fn for_request<R>(endpoint: &str, request: &R) -> Result<Self, KeyError>
    where
        R: Serialize + ?Sized,
    {
        let body = canonical_json(request).map_err(|source| KeyError::Serialize {
            endpoint: SmolStr::new(endpoint),
            source,
        })?;
        let key = CacheKey(SmolStr::from(format!("{endpoint}{SEPARATOR}{body}")));
        if key.is_tag_key() {
            return Err(KeyError::ReservedEndpoint {
                endpoint: SmolStr::new(endpoint),
            });
        }
        Ok(key)
    }

    /// Derives the tag index key for `tag`.
    pub fn for_tag(tag: &Tag) -> Self {
        CacheKey(SmolStr::from(format!("{TAG_NAMESPACE}{SEPARATOR}{tag}")))
    }

    /// Returns `true` if this key lives in the tag index namespace.
    pub fn is_tag_key(&self) -> bool {
        self.0
            .strip_prefix(TAG_NAMESPACE)
            .is_some_and(|rest| rest.starts_with(SEPARATOR))
    }

    /// Returns the key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the key length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the empty key.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(raw: &str) -> Self {
        CacheKey(SmolStr::new(raw))
    }
}

impl From<String> for CacheKey {
    fn from(raw: String) -> Self {
        CacheKey(SmolStr::from(raw))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Serialize)]
    struct Request {
        method: &'static str,
        url: String,
        headers: HashMap<String, String>,
    }

    fn request(headers: &[(&str, &str)]) -> Request {
        Request {
            method: "GET",
            url: "/items/42".to_owned(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_same_request_same_key() {
        let headers = [("b", "2"), ("a", "1"), ("c", "3"), ("d", "4")];
        let first = CacheKey::for_request("getItem", &request(&headers)).unwrap();
        for _ in 0..16 {
            let again = CacheKey::for_request("getItem", &request(&headers)).unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_request_key_layout() {
        let key = CacheKey::for_request("getItem", &request(&[("x", "1")])).unwrap();
        assert_eq!(
            key.as_str(),
            r#"getItem/{"headers":{"x":"1"},"method":"GET","url":"/items/42"}"#
        );
        assert!(!key.is_tag_key());
    }

    #[test]
    fn test_endpoint_is_part_of_primary_key() {
        let a = CacheKey::for_request("a", &1).unwrap();
        let b = CacheKey::for_request("b", &1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_tag_key() {
        let key = CacheKey::for_tag(&Tag::instance("Item", 42));
        assert_eq!(key.to_string(), "tags/Item:42");
        assert!(key.is_tag_key());
        assert!(!CacheKey::new("tagsItem").is_tag_key());
    }

    #[test]
    fn test_unserializable_request() {
        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys cannot become json object keys");
        let err = CacheKey::for_request("broken", &map).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[derive(Serialize)]
    struct Quote {
        price: f64,
    }

    #[test]
    fn test_non_finite_floats_are_rejected() {
        for price in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = CacheKey::for_request("getQuote", &Quote { price }).unwrap_err();
            assert!(matches!(err, KeyError::Serialize { .. }));
        }
        let key = CacheKey::for_request("getQuote", &Quote { price: 1.25 }).unwrap();
        assert_eq!(key.as_str(), r#"getQuote/{"price":1.25}"#);
    }

    #[test]
    fn test_request_key_cannot_shadow_tag_key() {
        let tag = CacheKey::for_tag(&Tag::class("42"));
        assert_eq!(tag.as_str(), "tags/42");

        for endpoint in ["tags", "tags/Item"] {
            let err = CacheKey::for_request(endpoint, &42u64).unwrap_err();
            assert!(matches!(err, KeyError::ReservedEndpoint { .. }));
        }
        assert!(CacheKey::for_request("tagsearch", &42u64).is_ok());
    }
}
