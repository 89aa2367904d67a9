//! Connection builder and dispatcher.
//!
//! A [`Connection`] is one logical bridge to one page. It owns the topic
//! registry and the evaluator and implements both directions:
//!
//! - outbound: [`Connection::send`] and friends encode an envelope, wrap it in
//!   the dispatch script and hand it to the evaluator
//! - inbound: [`Connection::receive`] validates an untrusted payload, looks up
//!   the topic handler, decodes `data` and runs the handler
//!
//! Inbound failures never reach the caller of `receive`; they are sent back
//! to the page as an error envelope. Handler failures are the exception and
//! are returned from `receive`.
//!
//! # Example
//!
//! ```
//! use nativebridge::{Connection, EvaluationCallback};
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! #[derive(Deserialize)]
//! struct Incoming {
//!     message: String,
//! }
//!
//! #[derive(Serialize)]
//! struct Outgoing {
//!     reply: String,
//! }
//!
//! let connection = Connection::builder(|script: String, done: EvaluationCallback| {
//!     println!("{script}");
//!     done(Ok(None));
//! })
//! .handle("ping", |incoming: Incoming, connection| {
//!     connection.send(&Outgoing { reply: incoming.message }, "ping");
//!     Ok(())
//! })
//! .build();
//!
//! connection
//!     .receive(json!({"topic": "ping", "data": {"message": "hi"}}))
//!     .unwrap();
//! ```

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{oneshot, watch};

use crate::codec::JsonCodec;
use crate::error::{BridgeError, DispatchError, HandlerResult, Result};
use crate::evaluator::{EvaluationResult, JavascriptEvaluator};
use crate::handler::TopicRegistry;
use crate::protocol::{
    build_script, parse_envelope, ConnectionError, ErrorObject, Rejection, DEFAULT_EVENT_NAME,
};
use crate::topic::{Topic, FALLBACK_ERROR_TOPIC};

/// Outcome of an outbound send.
#[derive(Debug)]
pub enum Reply {
    /// The script ran; carries the value it returned, if any.
    Success(Option<Value>),
    /// Encoding or evaluation failed.
    Error(BridgeError),
}

impl Reply {
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Reply::Success(_))
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Convert into a standard `Result`.
    pub fn into_result(self) -> Result<Option<Value>> {
        match self {
            Reply::Success(value) => Ok(value),
            Reply::Error(err) => Err(err),
        }
    }
}

impl From<EvaluationResult> for Reply {
    fn from(result: EvaluationResult) -> Self {
        match result {
            Ok(value) => Reply::Success(value),
            Err(err) => match err.downcast::<BridgeError>() {
                Ok(bridge) => Reply::Error(*bridge),
                Err(err) => Reply::Error(BridgeError::Evaluation(err)),
            },
        }
    }
}

/// Completion for a single send.
pub type ReplyCallback = Box<dyn FnOnce(Reply) + Send>;

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Name of the DOM event dispatched on `window`.
    ///
    /// Default: `"nativebridge"`
    pub event_name: String,
    /// Topic for errors that cannot be addressed to a received topic.
    ///
    /// Default: `"error"`
    pub fallback_topic: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            event_name: DEFAULT_EVENT_NAME.to_string(),
            fallback_topic: FALLBACK_ERROR_TOPIC.to_string(),
        }
    }
}

/// Builder for configuring and creating a [`Connection`].
pub struct ConnectionBuilder {
    evaluator: Box<dyn JavascriptEvaluator>,
    registry: TopicRegistry,
    config: ConnectionConfig,
}

impl ConnectionBuilder {
    /// Create a new builder around `evaluator`.
    pub fn new<E: JavascriptEvaluator>(evaluator: E) -> Self {
        Self {
            evaluator: Box::new(evaluator),
            registry: TopicRegistry::new(),
            config: ConnectionConfig::default(),
        }
    }

    /// Set the DOM event name.
    pub fn event_name(mut self, name: impl Into<String>) -> Self {
        self.config.event_name = name.into();
        self
    }

    /// Set the fallback error topic.
    pub fn fallback_topic(mut self, topic: impl Topic) -> Self {
        self.config.fallback_topic = topic.name().to_string();
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a topic handler.
    ///
    /// The handler receives the decoded `data` and the connection, so it can
    /// reply on the same bridge.
    pub fn handle<F, T>(mut self, topic: impl Topic, handler: F) -> Self
    where
        F: Fn(T, &Connection) -> HandlerResult + Send + Sync + 'static,
        T: DeserializeOwned + 'static,
    {
        self.registry.register(topic, handler);
        self
    }

    /// Build the connection.
    pub fn build(self) -> Connection {
        Connection {
            inner: Arc::new(Inner {
                evaluator: self.evaluator,
                registry: RwLock::new(self.registry),
                config: self.config,
                closed: watch::channel(()).0,
            }),
        }
    }
}

struct Inner {
    evaluator: Box<dyn JavascriptEvaluator>,
    registry: RwLock<TopicRegistry>,
    config: ConnectionConfig,
    // Never sent on; receivers observe the drop of `Inner`.
    closed: watch::Sender<()>,
}

/// A bridge to one page.
///
/// `Connection` is a cheap handle; clones share the same registry and
/// evaluator. Handlers are stored inside the connection, so a handler that
/// needs to keep the connection around must hold a [`WeakConnection`]
/// instead of a clone.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    /// Create a connection with default settings.
    pub fn new<E: JavascriptEvaluator>(evaluator: E) -> Self {
        ConnectionBuilder::new(evaluator).build()
    }

    /// Create a new connection builder.
    pub fn builder<E: JavascriptEvaluator>(evaluator: E) -> ConnectionBuilder {
        ConnectionBuilder::new(evaluator)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// Register a handler for `topic`, replacing any previous one.
    pub fn handle<F, T>(&self, topic: impl Topic, handler: F)
    where
        F: Fn(T, &Connection) -> HandlerResult + Send + Sync + 'static,
        T: DeserializeOwned + 'static,
    {
        self.write_registry().register(topic, handler);
    }

    /// Remove the handler for `topic`. Returns whether one was registered.
    pub fn remove_handler(&self, topic: impl Topic) -> bool {
        self.write_registry().remove(topic.name()).is_some()
    }

    pub fn has_handler(&self, topic: impl Topic) -> bool {
        self.read_registry().contains(topic.name())
    }

    /// Send `data` to the page on `topic`, ignoring the outcome.
    pub fn send<D>(&self, data: &D, topic: impl Topic)
    where
        D: Serialize + ?Sized,
    {
        self.deliver(topic.name(), data, None);
    }

    /// Send `data` to the page on `topic`.
    ///
    /// `completion` runs exactly once: with the evaluator's outcome, or
    /// immediately with [`BridgeError::Encode`] if `data` cannot be encoded,
    /// in which case the evaluator is not called.
    pub fn send_with<D, F>(&self, data: &D, topic: impl Topic, completion: F)
    where
        D: Serialize + ?Sized,
        F: FnOnce(Reply) + Send + 'static,
    {
        self.deliver(topic.name(), data, Some(Box::new(completion)));
    }

    /// Send `data` now and return a future resolving to the reply.
    ///
    /// The script is handed to the evaluator before this returns; awaiting
    /// is only needed to observe the outcome.
    pub fn send_async<D>(
        &self,
        data: &D,
        topic: impl Topic,
    ) -> impl Future<Output = Reply> + Send
    where
        D: Serialize + ?Sized,
    {
        let (tx, rx) = oneshot::channel();
        self.send_with(data, topic, move |reply| {
            let _ = tx.send(reply);
        });

        async move {
            rx.await
                .unwrap_or_else(|_| Reply::Error(BridgeError::CompletionDropped))
        }
    }

    /// Report inbound failures to the page.
    ///
    /// The envelope is addressed to `topic`, or to the fallback topic when
    /// none could be recovered from the payload.
    pub fn send_errors(&self, errors: &[ConnectionError], topic: Option<&str>) {
        let topic = topic.unwrap_or(self.inner.config.fallback_topic.as_str());
        self.deliver(topic, &ErrorObject::from_errors(errors), None);
    }

    /// Handle a payload delivered by the transport.
    ///
    /// Validation runs in a fixed order: shape, required fields, handler
    /// presence, data decoding. The first stage that fails is reported to the
    /// page and ends processing; `Ok(())` is returned in that case.
    ///
    /// # Errors
    ///
    /// Returns the handler's own error when the handler ran and failed.
    pub fn receive(&self, payload: Value) -> HandlerResult {
        let envelope = match parse_envelope(payload) {
            Ok(envelope) => envelope,
            Err(Rejection { topic, errors }) => {
                self.reject(&errors, topic.as_deref());
                return Ok(());
            }
        };

        let handler = self.read_registry().lookup(&envelope.topic);
        let handler = match handler {
            Some(handler) => handler,
            None => {
                self.reject(
                    &[ConnectionError::MissingTopicHandler],
                    Some(envelope.topic.as_str()),
                );
                return Ok(());
            }
        };

        tracing::debug!(topic = %envelope.topic, "Dispatching inbound message");

        match handler.call(envelope.data, self) {
            Ok(()) => Ok(()),
            Err(DispatchError::InvalidData { expected, source }) => {
                tracing::debug!(
                    topic = %envelope.topic,
                    error = %source,
                    "Inbound data did not decode"
                );
                self.reject(
                    &[ConnectionError::InvalidDataForHandler(expected)],
                    Some(envelope.topic.as_str()),
                );
                Ok(())
            }
            Err(DispatchError::Handler(err)) => {
                tracing::warn!(topic = %envelope.topic, error = %err, "Handler failed");
                Err(err)
            }
        }
    }

    /// Handle a payload delivered as JSON text.
    ///
    /// Text that is not valid JSON is reported as an illegal payload.
    pub fn receive_str(&self, text: &str) -> HandlerResult {
        match JsonCodec::parse(text) {
            Ok(payload) => self.receive(payload),
            Err(err) => {
                tracing::debug!(error = %err, "Inbound text is not JSON");
                self.reject(&[ConnectionError::IllegalPayloadFormat], None);
                Ok(())
            }
        }
    }

    /// Create a non-owning handle to this connection.
    pub fn downgrade(&self) -> WeakConnection {
        WeakConnection {
            inner: Arc::downgrade(&self.inner),
            closed: Some(self.inner.closed.subscribe()),
        }
    }

    fn reject(&self, errors: &[ConnectionError], topic: Option<&str>) {
        let codes: Vec<i32> = errors.iter().map(ConnectionError::code).collect();
        tracing::debug!(topic, ?codes, "Rejecting inbound payload");
        self.send_errors(errors, topic);
    }

    fn deliver<D>(&self, topic: &str, data: &D, completion: Option<ReplyCallback>)
    where
        D: Serialize + ?Sized,
    {
        let script = match build_script(&self.inner.config.event_name, topic, data) {
            Ok(script) => script,
            Err(err) => {
                if let Some(completion) = completion {
                    completion(Reply::Error(BridgeError::Encode(err)));
                }
                return;
            }
        };

        tracing::trace!(topic, "Evaluating outbound envelope");
        self.inner.evaluator.evaluate(
            script,
            Box::new(move |result: EvaluationResult| {
                if let Some(completion) = completion {
                    completion(Reply::from(result));
                }
            }),
        );
    }

    // The registry is a plain map, so a panic while it was locked cannot
    // leave it half-updated.
    fn read_registry(&self) -> RwLockReadGuard<'_, TopicRegistry> {
        self.inner
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, TopicRegistry> {
        self.inner
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("config", &self.inner.config)
            .field("handlers", &self.read_registry().len())
            .finish()
    }
}

/// Non-owning handle to a [`Connection`].
///
/// Every operation is a no-op once the connection has been dropped.
#[derive(Clone, Default)]
pub struct WeakConnection {
    inner: Weak<Inner>,
    closed: Option<watch::Receiver<()>>,
}

impl WeakConnection {
    /// Get the connection if it is still alive.
    pub fn upgrade(&self) -> Option<Connection> {
        self.inner.upgrade().map(|inner| Connection { inner })
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Resolve once the connection has been dropped.
    ///
    /// Resolves immediately for a handle that never pointed at a connection.
    pub async fn closed(&self) {
        if let Some(mut rx) = self.closed.clone() {
            while rx.changed().await.is_ok() {}
        }
    }

    /// Send if the connection is alive. Returns whether it was.
    pub fn send<D>(&self, data: &D, topic: impl Topic) -> bool
    where
        D: Serialize + ?Sized,
    {
        match self.upgrade() {
            Some(connection) => {
                connection.send(data, topic);
                true
            }
            None => false,
        }
    }

    /// Send with a completion if the connection is alive.
    ///
    /// When the connection is gone the completion is dropped uncalled and
    /// `false` is returned.
    pub fn send_with<D, F>(&self, data: &D, topic: impl Topic, completion: F) -> bool
    where
        D: Serialize + ?Sized,
        F: FnOnce(Reply) + Send + 'static,
    {
        match self.upgrade() {
            Some(connection) => {
                connection.send_with(data, topic, completion);
                true
            }
            None => false,
        }
    }

    /// Receive if the connection is alive; otherwise the payload is dropped.
    pub fn receive(&self, payload: Value) -> HandlerResult {
        match self.upgrade() {
            Some(connection) => connection.receive(payload),
            None => {
                tracing::debug!("Connection dropped, discarding inbound payload");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for WeakConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakConnection")
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::EvaluationCallback;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Deserialize)]
    struct DataUnit {
        #[serde(rename = "myProperty")]
        my_property: String,
    }

    fn recording() -> (Connection, Arc<Mutex<Vec<String>>>) {
        let scripts = Arc::new(Mutex::new(Vec::new()));
        let sink = scripts.clone();
        let connection = Connection::new(move |script: String, done: EvaluationCallback| {
            sink.lock().unwrap().push(script);
            done(Ok(None));
        });
        (connection, scripts)
    }

    #[test]
    fn test_config_defaults() {
        let (connection, _) = recording();
        assert_eq!(connection.config().event_name, "nativebridge");
        assert_eq!(connection.config().fallback_topic, "error");
    }

    #[test]
    fn test_builder_configuration() {
        let connection = Connection::builder(|_: String, _: EvaluationCallback| {})
            .event_name("bridge")
            .fallback_topic("failures")
            .handle("ping", |_: Value, _conn| Ok(()))
            .build();

        assert_eq!(connection.config().event_name, "bridge");
        assert_eq!(connection.config().fallback_topic, "failures");
        assert!(connection.has_handler("ping"));
    }

    #[test]
    fn test_custom_event_and_fallback_on_wire() {
        let scripts = Arc::new(Mutex::new(Vec::new()));
        let sink = scripts.clone();
        let connection = Connection::builder(move |script: String, done: EvaluationCallback| {
            sink.lock().unwrap().push(script);
            done(Ok(None));
        })
        .event_name("bridge")
        .fallback_topic("failures")
        .build();

        connection.receive(json!(42)).unwrap();

        assert_eq!(
            scripts.lock().unwrap()[0],
            "window.dispatchEvent(new CustomEvent(\"bridge\", {\"detail\":{\"topic\":\"failures\",\"data\":{\"errors\":[{\"message\":\"Illegal payload format\",\"errorCode\":1}]}}}))"
        );
    }

    #[test]
    fn test_reply_from_evaluation_error() {
        let result: EvaluationResult = Err("boom".into());
        let reply = Reply::from(result);
        assert!(reply.is_error());
        assert!(matches!(
            reply.into_result(),
            Err(BridgeError::Evaluation(_))
        ));
    }

    #[test]
    fn test_reply_unwraps_bridge_error() {
        let result: EvaluationResult = Err(Box::new(BridgeError::ChannelClosed));
        let reply = Reply::from(result);
        assert!(matches!(reply, Reply::Error(BridgeError::ChannelClosed)));
    }

    #[test]
    fn test_handler_can_register_reentrantly() {
        let (connection, _) = recording();
        connection.handle("setup", |_: Value, conn| {
            conn.handle("late", |_: Value, _conn| Ok(()));
            Ok(())
        });

        connection
            .receive(json!({"topic": "setup", "data": {}}))
            .unwrap();

        assert!(connection.has_handler("late"));
    }

    #[test]
    fn test_remove_handler() {
        let (connection, scripts) = recording();
        connection.handle("testType", |_: DataUnit, _conn| Ok(()));

        assert!(connection.remove_handler("testType"));
        assert!(!connection.remove_handler("testType"));

        connection
            .receive(json!({"topic": "testType", "data": {"myProperty": "x"}}))
            .unwrap();
        assert!(scripts.lock().unwrap()[0].contains("\"errorCode\":4"));
    }

    #[test]
    fn test_handler_error_is_returned() {
        let (connection, scripts) = recording();
        connection.handle("testType", |data: DataUnit, _conn| {
            Err(format!("cannot handle {}", data.my_property).into())
        });

        let err = connection
            .receive(json!({"topic": "testType", "data": {"myProperty": "x"}}))
            .unwrap_err();

        assert_eq!(err.to_string(), "cannot handle x");
        assert!(scripts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_receive_str() {
        let (connection, scripts) = recording();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        connection.handle("testType", move |_: DataUnit, _conn| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        connection
            .receive_str(r#"{"topic":"testType","data":{"myProperty":"x"}}"#)
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        connection.receive_str("{broken").unwrap();
        assert_eq!(
            scripts.lock().unwrap()[0],
            "window.dispatchEvent(new CustomEvent(\"nativebridge\", {\"detail\":{\"topic\":\"error\",\"data\":{\"errors\":[{\"message\":\"Illegal payload format\",\"errorCode\":1}]}}}))"
        );
    }

    #[test]
    fn test_weak_connection_after_drop() {
        let (connection, scripts) = recording();
        let weak = connection.downgrade();

        assert!(weak.is_alive());
        assert!(weak.send(&1, "count"));
        assert_eq!(scripts.lock().unwrap().len(), 1);

        drop(connection);

        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
        assert!(!weak.send(&2, "count"));
        assert!(!weak.send_with(&3, "count", |_| panic!("must not run")));
        assert!(weak.receive(json!("anything")).is_ok());
        assert_eq!(scripts.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_handler_holding_weak_connection_does_not_leak() {
        let (connection, _) = recording();
        let weak = connection.downgrade();
        let captured = connection.downgrade();
        connection.handle("ping", move |_: Value, _conn| {
            captured.send(&"pong", "ping");
            Ok(())
        });

        drop(connection);
        assert!(!weak.is_alive());
    }

    #[tokio::test]
    async fn test_weak_connection_closed_after_last_clone() {
        let (connection, _) = recording();
        let clone = connection.clone();
        let weak = connection.downgrade();
        let waiter = tokio::spawn(async move { weak.closed().await });

        drop(connection);
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(clone);
        waiter.await.unwrap();

        WeakConnection::default().closed().await;
    }

    #[tokio::test]
    async fn test_send_async_resolves() {
        let connection = Connection::new(|_: String, done: EvaluationCallback| {
            done(Ok(Some(json!("done"))));
        });

        let reply = connection.send_async(&json!({"a": 1}), "testType").await;
        assert_eq!(reply.into_result().unwrap(), Some(json!("done")));
    }

    #[tokio::test]
    async fn test_send_async_completion_dropped() {
        let connection = Connection::new(|_: String, done: EvaluationCallback| drop(done));

        let reply = connection.send_async(&1, "testType").await;
        assert!(matches!(reply, Reply::Error(BridgeError::CompletionDropped)));
    }

    #[test]
    fn test_debug_output() {
        let (connection, _) = recording();
        connection.handle("a", |_: Value, _conn| Ok(()));

        let debug = format!("{connection:?}");
        assert!(debug.contains("handlers: 1"));
        assert!(format!("{:?}", connection.downgrade()).contains("alive: true"));
    }
}
