//! Value encoding.
//!
//! Responses are stored as JSON bytes. Tag index entries are stored as the
//! UTF-8 bytes of the primary key they point to, without JSON framing.

use bytes::Bytes;
use querybox_core::{CacheKey, Raw};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error(transparent)]
    Serialize(Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Deserialize(Box<dyn std::error::Error + Send + Sync>),
}

/// JSON format for cached responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl JsonFormat {
    pub fn serialize<T>(&self, value: &T) -> Result<Raw, FormatError>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|err| FormatError::Serialize(Box::new(err)))
    }

    pub fn deserialize<T>(&self, data: &[u8]) -> Result<T, FormatError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(data).map_err(|err| FormatError::Deserialize(Box::new(err)))
    }

    /// Encodes a tag index entry pointing at `primary`.
    pub fn serialize_key(&self, primary: &CacheKey) -> Raw {
        Bytes::copy_from_slice(primary.as_str().as_bytes())
    }

    /// Decodes a tag index entry back into the primary key it points at.
    pub fn deserialize_key(&self, data: &[u8]) -> Result<CacheKey, FormatError> {
        std::str::from_utf8(data)
            .map(CacheKey::from)
            .map_err(|err| FormatError::Deserialize(Box::new(err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: u64,
        name: String,
    }

    #[test]
    fn test_response_bytes_are_json() {
        let item = Item {
            id: 1,
            name: "one".to_owned(),
        };
        let raw = JsonFormat.serialize(&item).unwrap();
        assert_eq!(&raw[..], br#"{"id":1,"name":"one"}"#);
        let back: Item = JsonFormat.deserialize(&raw).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_key_entry_is_plain_utf8() {
        let key = CacheKey::new("getItem/42");
        let raw = JsonFormat.serialize_key(&key);
        assert_eq!(&raw[..], b"getItem/42");
        assert_eq!(JsonFormat.deserialize_key(&raw).unwrap(), key);
    }

    #[test]
    fn test_invalid_utf8_key_entry() {
        let err = JsonFormat.deserialize_key(&[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, FormatError::Deserialize(_)));
    }

    #[test]
    fn test_shape_mismatch_is_deserialize_error() {
        let err = JsonFormat.deserialize::<Item>(b"[1,2,3]").unwrap_err();
        assert!(matches!(err, FormatError::Deserialize(_)));
    }
}
