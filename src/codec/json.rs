//! JSON codec using `serde_json`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// JSON codec for structured data.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value to compact JSON text.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized (for example a map
    /// with non-string keys).
    #[inline]
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
        serde_json::to_string(value)
    }

    /// Parse JSON text into an untyped value.
    #[inline]
    pub fn parse(text: &str) -> serde_json::Result<Value> {
        serde_json::from_str(text)
    }

    /// Decode an untyped value into `T`.
    ///
    /// Unknown fields are ignored; missing required fields and type
    /// mismatches fail.
    #[inline]
    pub fn decode_value<T: DeserializeOwned>(value: Value) -> serde_json::Result<T> {
        serde_json::from_value(value)
    }
}
