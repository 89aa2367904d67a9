//! Codec module - JSON encoding/decoding for envelopes and payloads.
//!
//! - [`JsonCodec`] - `serde_json` encode/decode
//!
//! # Design
//!
//! Codecs are marker structs with static methods rather than trait objects.
//! Outbound data is serialized straight to text (never through
//! `serde_json::Value`) so struct fields keep their declaration order on the
//! wire.
//!
//! # Example
//!
//! ```
//! use nativebridge::codec::JsonCodec;
//!
//! let encoded = JsonCodec::encode(&vec![1, 2, 3]).unwrap();
//! assert_eq!(encoded, "[1,2,3]");
//!
//! let value = JsonCodec::parse(&encoded).unwrap();
//! let decoded: Vec<i32> = JsonCodec::decode_value(value).unwrap();
//! assert_eq!(decoded, vec![1, 2, 3]);
//! ```

mod json;

pub use json::JsonCodec;
