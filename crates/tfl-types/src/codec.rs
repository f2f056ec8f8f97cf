//! JSON encoding of ledger records.
//!
//! Every record is stored as one UTF-8 JSON object per key. Records are built
//! as typed values and serialized directly; no record text is ever assembled
//! by hand.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::TypeError;

/// Marker for a type persisted as a single ledger value.
pub trait Record: Serialize + DeserializeOwned {
    /// Short human-readable name used in error messages and logs.
    const KIND: &'static str;
}

/// A record that is stored under its own natural id.
pub trait PrimaryRecord: Record {
    fn primary_key(&self) -> &str;
}

/// Encode a record to its ledger bytes.
pub fn encode<T: Record>(record: &T) -> Result<Vec<u8>, TypeError> {
    serde_json::to_vec(record).map_err(|e| TypeError::Encode {
        kind: T::KIND,
        reason: e.to_string(),
    })
}

/// Decode ledger bytes read from `key`.
pub fn decode<T: Record>(key: &str, bytes: &[u8]) -> Result<T, TypeError> {
    serde_json::from_slice(bytes).map_err(|e| TypeError::Corrupt {
        kind: T::KIND,
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Serde adapter for optional fields stored as the literal `"UNDEFINED"`
/// when absent.
pub mod undefined {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const UNDEFINED: &str = "UNDEFINED";

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        match value {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_str(UNDEFINED),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw == UNDEFINED {
            return Ok(None);
        }
        raw.parse().map(Some).map_err(D::Error::custom)
    }
}
