//! Envelope encoding (outbound) and validation (inbound).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ConnectionError, PayloadKey};

/// Outbound envelope borrowing its topic and data.
///
/// Field order is `topic`, then `data`.
#[derive(Serialize)]
pub struct Envelope<'a, T: ?Sized> {
    pub topic: &'a str,
    pub data: &'a T,
}

impl<'a, T: Serialize + ?Sized> Envelope<'a, T> {
    pub fn new(topic: &'a str, data: &'a T) -> Self {
        Self { topic, data }
    }
}

/// Payload for topics that carry no data. Encodes as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyData {}

/// An inbound envelope that passed structural validation.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEnvelope {
    pub topic: String,
    pub data: Value,
}

/// Structural validation failure for an inbound payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// Topic extracted from the payload, if any; errors are addressed to it.
    pub topic: Option<String>,
    /// Every failure found, in detection order.
    pub errors: Vec<ConnectionError>,
}

/// Validate the outer shape of an inbound payload.
///
/// A non-object payload is rejected on its own. Otherwise both required
/// fields are checked and every missing one is reported, so a payload
/// lacking `topic` and `data` yields two errors. A `topic` that is present
/// but not a string counts as missing. `data` may be any value, `null`
/// included.
pub fn parse_envelope(payload: Value) -> Result<InboundEnvelope, Rejection> {
    let mut object = match payload {
        Value::Object(object) => object,
        _ => {
            return Err(Rejection {
                topic: None,
                errors: vec![ConnectionError::IllegalPayloadFormat],
            })
        }
    };

    let mut errors = Vec::new();

    let topic = match object.remove(PayloadKey::Topic.as_str()) {
        Some(Value::String(topic)) => Some(topic),
        _ => {
            errors.push(ConnectionError::MissingField(PayloadKey::Topic));
            None
        }
    };

    let data = object.remove(PayloadKey::Data.as_str());
    if data.is_none() {
        errors.push(ConnectionError::MissingField(PayloadKey::Data));
    }

    match (topic, data) {
        (Some(topic), Some(data)) => Ok(InboundEnvelope { topic, data }),
        (topic, _) => Err(Rejection { topic, errors }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_field_order() {
        let data = json!({"myProperty": "Some value"});
        let envelope = Envelope::new("testType", &data);
        assert_eq!(
            serde_json::to_string(&envelope).unwrap(),
            r#"{"topic":"testType","data":{"myProperty":"Some value"}}"#
        );
    }

    #[test]
    fn test_envelope_unsized_data() {
        let envelope = Envelope::new("list", &[1, 2, 3][..]);
        assert_eq!(
            serde_json::to_string(&envelope).unwrap(),
            r#"{"topic":"list","data":[1,2,3]}"#
        );
    }

    #[test]
    fn test_empty_data() {
        assert_eq!(serde_json::to_string(&EmptyData {}).unwrap(), "{}");
        let decoded: EmptyData = serde_json::from_value(json!({"ignored": 1})).unwrap();
        assert_eq!(decoded, EmptyData::default());
    }

    #[test]
    fn test_parse_valid() {
        let parsed = parse_envelope(json!({"topic": "ping", "data": {"n": 1}})).unwrap();
        assert_eq!(parsed.topic, "ping");
        assert_eq!(parsed.data, json!({"n": 1}));
    }

    #[test]
    fn test_parse_null_data_is_present() {
        let parsed = parse_envelope(json!({"topic": "ping", "data": null})).unwrap();
        assert_eq!(parsed.data, Value::Null);
    }

    #[test]
    fn test_parse_not_an_object() {
        for payload in [json!("illegal format"), json!([1, 2]), json!(42), Value::Null] {
            let rejection = parse_envelope(payload).unwrap_err();
            assert_eq!(rejection.topic, None);
            assert_eq!(rejection.errors, vec![ConnectionError::IllegalPayloadFormat]);
        }
    }

    #[test]
    fn test_parse_both_fields_missing() {
        let rejection = parse_envelope(json!({"missing": "types"})).unwrap_err();
        assert_eq!(rejection.topic, None);
        assert_eq!(
            rejection.errors,
            vec![
                ConnectionError::MissingField(PayloadKey::Topic),
                ConnectionError::MissingField(PayloadKey::Data),
            ]
        );
    }

    #[test]
    fn test_parse_data_missing_keeps_topic() {
        let rejection = parse_envelope(json!({"topic": "testType"})).unwrap_err();
        assert_eq!(rejection.topic.as_deref(), Some("testType"));
        assert_eq!(
            rejection.errors,
            vec![ConnectionError::MissingField(PayloadKey::Data)]
        );
    }

    #[test]
    fn test_parse_topic_wrong_kind() {
        let rejection = parse_envelope(json!({"topic": 7, "data": {}})).unwrap_err();
        assert_eq!(rejection.topic, None);
        assert_eq!(
            rejection.errors,
            vec![ConnectionError::MissingField(PayloadKey::Topic)]
        );
    }
}
