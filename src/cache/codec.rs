//! Encoding of cached results into opaque payload bytes

use serde::{de::DeserializeOwned, Serialize};

use crate::cache::check_finite;
use crate::error::CacheError;

/// Encodes typed values into bytes and back
pub trait Codec: Send + Sync {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CacheError>;

    fn decode<T: DeserializeOwned>(&self, payload: &[u8]) -> Result<T, CacheError>;
}

/// Stores payloads as compact JSON
///
/// Values containing NaN or infinite floats are refused rather than written as
/// `null`, so a stored payload always decodes to the value that was encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CacheError> {
        check_finite(value).map_err(|e| CacheError::Encode(e.to_string()))?;
        serde_json::to_vec(value).map_err(|e| CacheError::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, payload: &[u8]) -> Result<T, CacheError> {
        serde_json::from_slice(payload).map_err(|e| CacheError::Decode(e.to_string()))
    }
}
