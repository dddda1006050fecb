//! Serialization of the backing map.
//!
//! A map is encoded as a plain key-to-value mapping (order unspecified).
//! `Codec` abstracts the wire format; `JsonCodec` is the default.
//! Decoding never holds the lock while parsing: the payload is decoded into
//! a fresh map first, then swapped in under the write lock, so a malformed
//! payload leaves the container untouched.

use crate::concurrent_map::ConcurrentMap;
use crate::error::{Error, Result};
use crate::mode::LockMode;
use core::hash::{BuildHasher, Hash};
use hashbrown::HashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

/// Encode/decode contract used to persist a map.
pub trait Codec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Fails with `Error::Format` on malformed or type-mismatched input.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// JSON object encoding via `serde_json`.
#[derive(Copy, Clone, Debug, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| Error::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| Error::Format(e.to_string()))
    }
}

impl<K, V, M, S> Serialize for ConcurrentMap<K, V, M, S>
where
    K: Serialize + Eq + Hash,
    V: Serialize,
    M: LockMode,
    S: BuildHasher,
{
    fn serialize<Ser>(&self, serializer: Ser) -> core::result::Result<Ser::Ok, Ser::Error>
    where
        Ser: Serializer,
    {
        self.read().serialize(serializer)
    }
}

impl<'de, K, V, M, S> Deserialize<'de> for ConcurrentMap<K, V, M, S>
where
    K: Deserialize<'de> + Eq + Hash,
    V: Deserialize<'de>,
    M: LockMode,
    S: BuildHasher + Default,
{
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        HashMap::deserialize(deserializer).map(Self::from_map)
    }
}

impl<K, V, M, S> ConcurrentMap<K, V, M, S>
where
    K: Eq + Hash,
    M: LockMode,
    S: BuildHasher,
{
    /// Encode the entries as JSON under the read lock.
    pub fn encode(&self) -> Result<Vec<u8>>
    where
        K: Serialize,
        V: Serialize,
    {
        self.encode_with(&JsonCodec)
    }

    pub fn encode_with<C: Codec>(&self, codec: &C) -> Result<Vec<u8>>
    where
        K: Serialize,
        V: Serialize,
    {
        codec.encode(&*self.read())
    }

    /// Replace the contents with the JSON mapping in `bytes`.
    pub fn decode_into(&self, bytes: &[u8]) -> Result<()>
    where
        K: DeserializeOwned,
        V: DeserializeOwned,
        S: Default,
    {
        self.decode_into_with(&JsonCodec, bytes)
    }

    /// Replace the contents with the mapping `codec` decodes from `bytes`.
    /// On error the map is left unchanged.
    pub fn decode_into_with<C: Codec>(&self, codec: &C, bytes: &[u8]) -> Result<()>
    where
        K: DeserializeOwned,
        V: DeserializeOwned,
        S: Default,
    {
        let decoded: HashMap<K, V, S> = match codec.decode(bytes) {
            Ok(map) => map,
            Err(e) => {
                warn!(error = %e, len = bytes.len(), "rejected map payload");
                return Err(e);
            }
        };
        let old = core::mem::replace(&mut *self.write(), decoded);
        drop(old);
        Ok(())
    }
}
