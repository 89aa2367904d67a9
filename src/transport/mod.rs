//! Transport module - feeding inbound payloads to a connection.
//!
//! The host intercepts messages posted by the page (a script message handler,
//! a JavaScript interface, an IPC channel) and forwards each decoded payload
//! into a tokio channel. A listener task drains that channel into
//! [`Connection::receive`](crate::Connection::receive).

mod listener;

pub use listener::{listen, spawn_listener, DEFAULT_CHANNEL_CAPACITY};
