//! Topic naming.
//!
//! A topic is the string both sides use to route a message. Anything that can
//! produce a stable name can be used as a topic: string slices, owned strings,
//! or an application enum.
//!
//! # Example
//!
//! ```
//! use nativebridge::Topic;
//!
//! enum AppTopic {
//!     Ping,
//!     Settings,
//! }
//!
//! impl Topic for AppTopic {
//!     fn name(&self) -> &str {
//!         match self {
//!             AppTopic::Ping => "ping",
//!             AppTopic::Settings => "settings",
//!         }
//!     }
//! }
//!
//! assert_eq!(AppTopic::Ping.name(), "ping");
//! assert_eq!("settings".name(), "settings");
//! ```

/// Topic name used for errors that cannot be addressed to a received topic.
pub const FALLBACK_ERROR_TOPIC: &str = "error";

/// A value that names a topic.
pub trait Topic {
    /// The wire name of this topic.
    fn name(&self) -> &str;
}

impl Topic for str {
    #[inline]
    fn name(&self) -> &str {
        self
    }
}

impl Topic for String {
    #[inline]
    fn name(&self) -> &str {
        self.as_str()
    }
}

impl<T: Topic + ?Sized> Topic for &T {
    #[inline]
    fn name(&self) -> &str {
        (**self).name()
    }
}
