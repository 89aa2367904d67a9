//! Script evaluation seam.
//!
//! The bridge never runs JavaScript itself. It hands each outbound script to a
//! [`JavascriptEvaluator`] and waits for the completion callback. A web view
//! binding implements the trait directly; plain closures implement it too.
//!
//! [`ChannelEvaluator`] is for hosts where the web view must be driven from a
//! dedicated thread or task:
//!
//! ```text
//! Connection ─► mpsc::UnboundedSender<ScriptRequest> ─► UI task ─► web view
//! ```
//!
//! # Example
//!
//! ```
//! use nativebridge::{ChannelEvaluator, Connection};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (evaluator, mut scripts) = ChannelEvaluator::new();
//! let connection = Connection::new(evaluator);
//!
//! tokio::spawn(async move {
//!     while let Some(request) = scripts.recv().await {
//!         // run request.script() in the page, then:
//!         request.complete(Ok(None));
//!     }
//! });
//!
//! let reply = connection.send_async(&"hello", "greeting").await;
//! assert!(reply.is_success());
//! # }
//! ```

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{BridgeError, EvaluationError};

/// Outcome of evaluating a script: the script's value, if any, or an error.
pub type EvaluationResult = std::result::Result<Option<Value>, EvaluationError>;

/// Completion invoked once with the evaluation outcome.
pub type EvaluationCallback = Box<dyn FnOnce(EvaluationResult) + Send>;

/// Receiving half of a [`ChannelEvaluator`].
pub type ScriptReceiver = mpsc::UnboundedReceiver<ScriptRequest>;

/// Something that can run a script in the page.
pub trait JavascriptEvaluator: Send + Sync + 'static {
    /// Run `script` and call `completion` exactly once when it finishes.
    ///
    /// The completion may run inline or later, on any thread.
    fn evaluate(&self, script: String, completion: EvaluationCallback);
}

impl<F> JavascriptEvaluator for F
where
    F: Fn(String, EvaluationCallback) + Send + Sync + 'static,
{
    fn evaluate(&self, script: String, completion: EvaluationCallback) {
        self(script, completion)
    }
}

/// A script waiting to be evaluated by the owner of the web view.
///
/// Dropping a request without completing it completes it with
/// [`BridgeError::CompletionDropped`].
pub struct ScriptRequest {
    script: String,
    completion: Option<EvaluationCallback>,
}

impl ScriptRequest {
    fn new(script: String, completion: EvaluationCallback) -> Self {
        Self {
            script,
            completion: Some(completion),
        }
    }

    #[inline]
    pub fn script(&self) -> &str {
        &self.script
    }

    /// Report the outcome of the evaluation.
    pub fn complete(mut self, result: EvaluationResult) {
        if let Some(completion) = self.completion.take() {
            completion(result);
        }
    }
}

impl Drop for ScriptRequest {
    fn drop(&mut self) {
        if let Some(completion) = self.completion.take() {
            completion(Err(Box::new(BridgeError::CompletionDropped)));
        }
    }
}

impl std::fmt::Debug for ScriptRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRequest")
            .field("script", &self.script)
            .field("pending", &self.completion.is_some())
            .finish()
    }
}

/// Evaluator that forwards scripts over an unbounded channel.
///
/// `evaluate` never blocks. When the receiver is gone the completion runs
/// immediately with [`BridgeError::ChannelClosed`].
#[derive(Clone)]
pub struct ChannelEvaluator {
    tx: mpsc::UnboundedSender<ScriptRequest>,
}

impl ChannelEvaluator {
    /// Create an evaluator and the receiver the web view owner drains.
    pub fn new() -> (Self, ScriptReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl JavascriptEvaluator for ChannelEvaluator {
    fn evaluate(&self, script: String, completion: EvaluationCallback) {
        if let Err(mpsc::error::SendError(mut request)) =
            self.tx.send(ScriptRequest::new(script, completion))
        {
            if let Some(completion) = request.completion.take() {
                completion(Err(Box::new(BridgeError::ChannelClosed)));
            }
        }
    }
}
