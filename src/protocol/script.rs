//! Script template used to deliver an envelope to the page.
//!
//! ```text
//! window.dispatchEvent(new CustomEvent("nativebridge", {"detail":<envelope>}))
//! ```

use serde::Serialize;

use super::Envelope;
use crate::codec::JsonCodec;

/// Name of the DOM event the page listens for.
pub const DEFAULT_EVENT_NAME: &str = "nativebridge";

/// Encode `data` for `topic` and wrap it in the dispatch script.
///
/// # Errors
///
/// Returns error if the data cannot be encoded as JSON. Nothing is produced
/// in that case.
pub fn build_script<T: Serialize + ?Sized>(
    event_name: &str,
    topic: &str,
    data: &T,
) -> serde_json::Result<String> {
    let event = JsonCodec::encode(event_name)?;
    let envelope = JsonCodec::encode(&Envelope::new(topic, data))?;
    Ok(format!(
        "window.dispatchEvent(new CustomEvent({event}, {{\"detail\":{envelope}}}))"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_script_exact_shape() {
        let script = build_script(
            DEFAULT_EVENT_NAME,
            "testType",
            &json!({"myProperty": "Some value"}),
        )
        .unwrap();

        assert_eq!(
            script,
            "window.dispatchEvent(new CustomEvent(\"nativebridge\", {\"detail\":{\"topic\":\"testType\",\"data\":{\"myProperty\":\"Some value\"}}}))"
        );
    }

    #[test]
    fn test_script_escapes_topic_and_event() {
        let script = build_script("my\"event", "a\"b", &1).unwrap();
        assert_eq!(
            script,
            "window.dispatchEvent(new CustomEvent(\"my\\\"event\", {\"detail\":{\"topic\":\"a\\\"b\",\"data\":1}}))"
        );
    }
}
