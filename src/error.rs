//! Error types for nativebridge.
//!
//! Two disjoint domains live here:
//!
//! - [`BridgeError`] covers outbound failures and is delivered through
//!   [`Reply::Error`](crate::Reply::Error).
//! - [`DispatchError`] is what a type-erased handler wrapper returns when an
//!   inbound message cannot be delivered to, or fails inside, a handler.
//!
//! Inbound protocol failures that are reported back to the page use
//! [`ConnectionError`](crate::protocol::ConnectionError) instead.

use thiserror::Error;

/// Error reported by a [`JavascriptEvaluator`](crate::JavascriptEvaluator).
pub type EvaluationError = Box<dyn std::error::Error + Send + Sync>;

/// Error returned by a topic handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for handler functions.
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Main error type for outbound operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The data or the envelope could not be encoded as JSON.
    #[error("JSON encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The evaluator reported a failure while running the script.
    #[error("Script evaluation failed: {0}")]
    Evaluation(#[source] EvaluationError),

    /// The evaluator channel has no receiver any more.
    #[error("Evaluator channel closed")]
    ChannelClosed,

    /// The evaluator dropped the completion without calling it.
    #[error("Evaluator dropped the completion")]
    CompletionDropped,
}

/// Result type alias using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Failure produced while handing inbound data to a handler.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// `data` did not decode into the handler's declared type.
    #[error("Invalid data for `{expected}`: {source}")]
    InvalidData {
        /// Short name of the declared input type.
        expected: String,
        #[source]
        source: serde_json::Error,
    },

    /// The handler ran and returned an error.
    #[error("Handler failed: {0}")]
    Handler(#[source] HandlerError),
}
