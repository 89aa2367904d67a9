//! Handler module - topic registration and type-erased dispatch.
//!
//! Provides:
//! - [`TopicRegistry`] - maps topic names to handlers
//! - [`Handler`] / [`TypedHandler`] - the erased wrapper that decodes inbound
//!   `data` into a handler's declared type
//!
//! # Example
//!
//! ```
//! use nativebridge::handler::TopicRegistry;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Ping {
//!     message: String,
//! }
//!
//! let mut registry = TopicRegistry::new();
//! registry.register("ping", |ping: Ping, _connection| {
//!     println!("{}", ping.message);
//!     Ok(())
//! });
//!
//! assert!(registry.contains("ping"));
//! assert_eq!(registry.lookup("ping").unwrap().expected_type(), "Ping");
//! ```

mod registry;

pub use registry::{short_type_name, Handler, TopicRegistry, TypedHandler};
