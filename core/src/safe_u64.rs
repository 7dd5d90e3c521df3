//! `safe_uint64` (§9.4): a `u64` that serializes as a JSON string (since
//! JavaScript's `Number` loses precision above 2^53) but deserializes from
//! either a JSON string or a JSON number, so older clients that still send
//! bare numbers keep working.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SafeU64(pub u64);

impl From<u64> for SafeU64 {
    fn from(v: u64) -> Self {
        SafeU64(v)
    }
}

impl From<SafeU64> for u64 {
    fn from(v: SafeU64) -> Self {
        v.0
    }
}

impl Serialize for SafeU64 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

struct SafeU64Visitor;

impl<'de> Visitor<'de> for SafeU64Visitor {
    type Value = SafeU64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a u64 encoded as a JSON string or number")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(SafeU64(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v).map(SafeU64).map_err(|_| E::custom("negative safe_uint64"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse::<u64>().map(SafeU64).map_err(|_| E::custom("invalid safe_uint64 string"))
    }
}

impl<'de> Deserialize<'de> for SafeU64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SafeU64Visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&SafeU64(18_446_744_073_709_551_615)).unwrap();
        assert_eq!(json, "\"18446744073709551615\"");
    }

    #[test]
    fn deserializes_from_string_or_number() {
        assert_eq!(serde_json::from_str::<SafeU64>("\"42\"").unwrap().0, 42);
        assert_eq!(serde_json::from_str::<SafeU64>("42").unwrap().0, 42);
    }

    #[test]
    fn rejects_negative_numbers() {
        assert!(serde_json::from_str::<SafeU64>("-1").is_err());
    }
}
