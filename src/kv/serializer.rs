//! Value serializers.
//!
//! The store never looks inside a value: it hands the value to a
//! [`Serializer`] and persists whatever bytes come back. Any implementation
//! works as long as it can round-trip the values a caller stores and can
//! also encode a `String -> value` mapping (used by `dump`/`load`).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::KvError;

/// MessagePack marker byte for `nil`.
const MSGPACK_NIL: u8 = 0xc0;

/// Encoding and decoding of stored values.
pub trait Serializer {
    /// Encode a value to bytes.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, KvError>;

    /// Decode bytes produced by [`encode`](Self::encode).
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, KvError>;

    /// Returns `true` if `bytes` is this format's encoding of "no value"
    /// (`None` or `()`).
    fn is_nil(&self, bytes: &[u8]) -> bool;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// MessagePack serializer (the default).
///
/// Structs are written with field names so stored values stay
/// self-describing and can be read back as a generic value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessagePack;

impl Serializer for MessagePack {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, KvError> {
        rmp_serde::to_vec_named(value).map_err(KvError::serialization)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, KvError> {
        rmp_serde::from_slice(bytes).map_err(KvError::serialization)
    }

    fn is_nil(&self, bytes: &[u8]) -> bool {
        matches!(bytes, [MSGPACK_NIL])
    }

    fn name(&self) -> &'static str {
        "msgpack"
    }
}

/// JSON serializer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Json;

impl Serializer for Json {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, KvError> {
        serde_json::to_vec(value).map_err(KvError::serialization)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, KvError> {
        serde_json::from_slice(bytes).map_err(KvError::serialization)
    }

    fn is_nil(&self, bytes: &[u8]) -> bool {
        bytes.trim_ascii() == b"null"
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

/// Serializer chosen at runtime, e.g. from a config file or a CLI flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Format {
    /// [`MessagePack`]
    #[default]
    #[serde(alias = "messagepack")]
    Msgpack,
    /// [`Json`]
    Json,
}

impl Serializer for Format {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, KvError> {
        match self {
            Self::Msgpack => MessagePack.encode(value),
            Self::Json => Json.encode(value),
        }
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, KvError> {
        match self {
            Self::Msgpack => MessagePack.decode(bytes),
            Self::Json => Json.decode(bytes),
        }
    }

    fn is_nil(&self, bytes: &[u8]) -> bool {
        match self {
            Self::Msgpack => MessagePack.is_nil(bytes),
            Self::Json => Json.is_nil(bytes),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Msgpack => MessagePack.name(),
            Self::Json => Json.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_msgpack_roundtrip_struct() {
        let bytes = MessagePack.encode(&Point { x: 3, y: -4 }).unwrap();
        let point: Point = MessagePack.decode(&bytes).unwrap();
        assert_eq!(point, Point { x: 3, y: -4 });
    }

    #[test]
    fn test_msgpack_struct_is_self_describing() {
        let bytes = MessagePack.encode(&Point { x: 1, y: 2 }).unwrap();
        let generic: serde_json::Value = MessagePack.decode(&bytes).unwrap();
        assert_eq!(generic, serde_json::json!({"x": 1, "y": 2}));
    }

    #[test]
    fn test_nil_detection() {
        assert!(MessagePack.is_nil(&MessagePack.encode(&None::<u8>).unwrap()));
        assert!(MessagePack.is_nil(&MessagePack.encode(&()).unwrap()));
        assert!(!MessagePack.is_nil(&MessagePack.encode(&Some(0u8)).unwrap()));
        assert!(!MessagePack.is_nil(&MessagePack.encode("").unwrap()));

        assert!(Json.is_nil(&Json.encode(&None::<String>).unwrap()));
        assert!(Json.is_nil(b" null\n"));
        assert!(!Json.is_nil(&Json.encode("null").unwrap()));
        assert!(!Json.is_nil(&Json.encode(&Vec::<u8>::new()).unwrap()));
    }

    #[test]
    fn test_decode_garbage_is_serialization_error() {
        let err = Json.decode::<Point>(b"{not json").unwrap_err();
        assert!(matches!(err, KvError::Serialization(_)));

        let err = MessagePack.decode::<Point>(&[0xc1]).unwrap_err();
        assert!(matches!(err, KvError::Serialization(_)));
    }

    #[test]
    fn test_mapping_roundtrip() {
        let mut map = BTreeMap::new();
        map.insert("ns/a".to_string(), vec![1u32, 2]);
        map.insert("ns/b".to_string(), vec![]);

        for format in [Format::Msgpack, Format::Json] {
            let bytes = format.encode(&map).unwrap();
            let back: BTreeMap<String, Vec<u32>> = format.decode(&bytes).unwrap();
            assert_eq!(back, map, "format {}", format.name());
        }
    }

    #[test]
    fn test_format_from_config_names() {
        let format: Format = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, Format::Json);
        let format: Format = serde_json::from_str("\"messagepack\"").unwrap();
        assert_eq!(format, Format::Msgpack);
        assert_eq!(Format::default(), Format::Msgpack);
    }
}
