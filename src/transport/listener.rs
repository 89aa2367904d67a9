//! Inbound listener task.
//!
//! # Example
//!
//! ```
//! use nativebridge::transport::{spawn_listener, DEFAULT_CHANNEL_CAPACITY};
//! use nativebridge::{Connection, EvaluationCallback};
//! use serde_json::{json, Value};
//! use tokio::sync::mpsc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let connection = Connection::new(|_: String, done: EvaluationCallback| done(Ok(None)));
//! connection.handle("ping", |_: Value, _conn| Ok(()));
//!
//! let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
//! let task = spawn_listener(connection.downgrade(), rx);
//!
//! tx.send(json!({"topic": "ping", "data": {}})).await.unwrap();
//! drop(tx);
//! task.await.unwrap();
//! # }
//! ```

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::connection::WeakConnection;

/// Suggested capacity for the inbound channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Deliver payloads from `rx` to the connection until the channel closes or
/// the connection is dropped.
///
/// Only a weak handle is held, so a running listener never keeps a
/// connection alive. Handler failures are logged and do not stop the loop.
pub async fn listen(connection: WeakConnection, mut rx: mpsc::Receiver<Value>) {
    loop {
        let payload = tokio::select! {
            payload = rx.recv() => payload,
            _ = connection.closed() => {
                tracing::debug!("Connection dropped, stopping inbound listener");
                return;
            }
        };
        let Some(payload) = payload else {
            break;
        };

        let live = match connection.upgrade() {
            Some(live) => live,
            None => {
                tracing::debug!("Connection dropped, stopping inbound listener");
                return;
            }
        };

        if let Err(e) = live.receive(payload) {
            tracing::error!("Handler error: {}", e);
        }
    }

    tracing::debug!("Inbound channel closed");
}

/// Spawn [`listen`] on the current tokio runtime.
pub fn spawn_listener(connection: WeakConnection, rx: mpsc::Receiver<Value>) -> JoinHandle<()> {
    tokio::spawn(listen(connection, rx))
}
