//! # nativebridge
//!
//! Topic-based message bridge between a native host and a web page embedded
//! in it.
//!
//! Both sides address each other by topic and exchange JSON envelopes:
//!
//! ```text
//! {"topic":"<name>","data":<json-value>}
//! ```
//!
//! ## Architecture
//!
//! - **Outbound**: the envelope is wrapped in a script that dispatches a
//!   `nativebridge` `CustomEvent` on `window`; a [`JavascriptEvaluator`] runs
//!   it and reports back through a [`Reply`]
//! - **Inbound**: the host hands each payload the page posted to
//!   [`Connection::receive`], which validates it and calls the handler
//!   registered for its topic, or answers with an error envelope
//!
//! ## Example
//!
//! ```
//! use nativebridge::{Connection, EvaluationCallback, Reply};
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! #[derive(Deserialize)]
//! struct Ping {
//!     message: String,
//! }
//!
//! #[derive(Serialize)]
//! struct Pong {
//!     echo: String,
//! }
//!
//! let connection = Connection::new(|script: String, done: EvaluationCallback| {
//!     // web_view.evaluate_javascript(script, done)
//!     done(Ok(None));
//! });
//!
//! connection.handle("ping", |ping: Ping, connection| {
//!     connection.send_with(&Pong { echo: ping.message }, "pong", |reply| {
//!         if let Reply::Error(e) = reply {
//!             eprintln!("pong failed: {e}");
//!         }
//!     });
//!     Ok(())
//! });
//!
//! connection
//!     .receive(json!({"topic": "ping", "data": {"message": "hello"}}))
//!     .unwrap();
//! ```

pub mod codec;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod transport;

mod connection;
mod evaluator;
mod topic;

pub use connection::{
    Connection, ConnectionBuilder, ConnectionConfig, Reply, ReplyCallback, WeakConnection,
};
pub use error::{BridgeError, DispatchError, EvaluationError, HandlerError, HandlerResult};
pub use evaluator::{
    ChannelEvaluator, EvaluationCallback, EvaluationResult, JavascriptEvaluator, ScriptReceiver,
    ScriptRequest,
};
pub use protocol::{ConnectionError, EmptyData};
pub use topic::{Topic, FALLBACK_ERROR_TOPIC};
