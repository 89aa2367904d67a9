//! Inbound validation failures and their wire representation.
//!
//! | code | error                                  |
//! |------|----------------------------------------|
//! | 1    | payload is not a string-keyed object   |
//! | 2    | `topic` missing or not a string        |
//! | 3    | `data` missing                         |
//! | 4    | no handler registered for the topic    |
//! | 5    | `data` does not fit the handler's type |

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Required top-level envelope field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKey {
    Topic,
    Data,
}

impl PayloadKey {
    /// Field name on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            PayloadKey::Topic => "topic",
            PayloadKey::Data => "data",
        }
    }
}

impl fmt::Display for PayloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured validation failure reported back to the page.
///
/// `Display` yields the exact wire message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("Illegal payload format")]
    IllegalPayloadFormat,

    #[error("Missing field: '{0}'")]
    MissingField(PayloadKey),

    #[error("Missing topic handler")]
    MissingTopicHandler,

    #[error("Invalid data for topic. Expected data type: '{0}'")]
    InvalidDataForHandler(String),
}

impl ConnectionError {
    /// Stable numeric code sent as `errorCode`.
    pub fn code(&self) -> i32 {
        match self {
            ConnectionError::IllegalPayloadFormat => 1,
            ConnectionError::MissingField(PayloadKey::Topic) => 2,
            ConnectionError::MissingField(PayloadKey::Data) => 3,
            ConnectionError::MissingTopicHandler => 4,
            ConnectionError::InvalidDataForHandler(_) => 5,
        }
    }

    /// Wire form of this error.
    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail {
            message: self.to_string(),
            error_code: self.code(),
        }
    }
}

/// One entry of the `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub message: String,
    pub error_code: i32,
}

/// `data` of an error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorObject {
    pub errors: Vec<ErrorDetail>,
}

impl ErrorObject {
    /// Collect the wire form of each error, preserving order.
    pub fn from_errors(errors: &[ConnectionError]) -> Self {
        Self {
            errors: errors.iter().map(ConnectionError::detail).collect(),
        }
    }
}
