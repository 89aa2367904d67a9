//! Topic registry for dispatching inbound messages by topic name.
//!
//! At most one handler exists per topic; registering a topic again replaces
//! the previous handler.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::codec::JsonCodec;
use crate::connection::Connection;
use crate::error::{DispatchError, HandlerResult};
use crate::topic::Topic;

/// Trait for type-erased handlers.
pub trait Handler: Send + Sync + 'static {
    /// Decode `data` and run the handler.
    fn call(&self, data: Value, connection: &Connection) -> Result<(), DispatchError>;

    /// Short name of the type `data` must decode into.
    fn expected_type(&self) -> &str;
}

/// Wrapper that deserializes `data` before calling the handler.
pub struct TypedHandler<F, T>
where
    F: Fn(T, &Connection) -> HandlerResult + Send + Sync + 'static,
    T: DeserializeOwned + 'static,
{
    handler: F,
    type_name: String,
    _phantom: PhantomData<fn(T)>,
}

impl<F, T> TypedHandler<F, T>
where
    F: Fn(T, &Connection) -> HandlerResult + Send + Sync + 'static,
    T: DeserializeOwned + 'static,
{
    /// Create a new typed handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            type_name: short_type_name::<T>(),
            _phantom: PhantomData,
        }
    }
}

impl<F, T> Handler for TypedHandler<F, T>
where
    F: Fn(T, &Connection) -> HandlerResult + Send + Sync + 'static,
    T: DeserializeOwned + 'static,
{
    fn call(&self, data: Value, connection: &Connection) -> Result<(), DispatchError> {
        let parsed: T = JsonCodec::decode_value(data).map_err(|source| {
            DispatchError::InvalidData {
                expected: self.type_name.clone(),
                source,
            }
        })?;

        (self.handler)(parsed, connection).map_err(DispatchError::Handler)
    }

    fn expected_type(&self) -> &str {
        &self.type_name
    }
}

/// Registry mapping topic names to handlers.
#[derive(Default)]
pub struct TopicRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl TopicRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed handler for `topic`, replacing any previous one.
    pub fn register<F, T>(&mut self, topic: impl Topic, handler: F)
    where
        F: Fn(T, &Connection) -> HandlerResult + Send + Sync + 'static,
        T: DeserializeOwned + 'static,
    {
        self.register_handler(topic, Arc::new(TypedHandler::new(handler)));
    }

    /// Register an already erased handler for `topic`.
    pub fn register_handler(&mut self, topic: impl Topic, handler: Arc<dyn Handler>) {
        self.handlers.insert(topic.name().to_string(), handler);
    }

    /// Get the handler for a topic name.
    pub fn lookup(&self, topic: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(topic).cloned()
    }

    /// Remove the handler for a topic name, returning it.
    pub fn remove(&mut self, topic: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.remove(topic)
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.handlers.contains_key(topic)
    }

    /// Registered topic names, in no particular order.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// `std::any::type_name` with every module path stripped.
///
/// `alloc::vec::Vec<alloc::string::String>` becomes `Vec<String>`.
pub fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    let mut chars = full.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            c if c.is_alphanumeric() || c == '_' => segment.push(c),
            other => {
                out.push_str(&segment);
                segment.clear();
                out.push(other);
            }
        }
    }
    out.push_str(&segment);
    out
}
