//! Value encoding for tiers that store bytes.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{CacheError, CacheResult};

/// Encodes records to bytes and back.
pub trait Codec<T>: Send + Sync {
    fn encode(&self, value: &T) -> CacheResult<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> CacheResult<T>;
}

/// JSON encoding (serde_json). Default for the Redis tier.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> CacheResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| CacheError::serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> CacheResult<T> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::serialization(e.to_string()))
    }
}

/// MessagePack encoding (rmp-serde), more compact than JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePackCodec;

impl<T> Codec<T> for MessagePackCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> CacheResult<Vec<u8>> {
        rmp_serde::to_vec_named(value).map_err(|e| CacheError::serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> CacheResult<T> {
        rmp_serde::from_slice(bytes).map_err(|e| CacheError::serialization(e.to_string()))
    }
}
