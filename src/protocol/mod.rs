//! Protocol module - envelope format, script template, and error taxonomy.
//!
//! Every message in either direction is an envelope:
//!
//! ```text
//! {"topic":"<name>","data":<json-value>}
//! ```
//!
//! Outbound envelopes are delivered to the page by evaluating a script that
//! dispatches a `CustomEvent` carrying the envelope as its `detail`. Inbound
//! envelopes arrive as untyped JSON values and are validated before dispatch.

mod connection_error;
mod envelope;
mod script;

pub use connection_error::{ConnectionError, ErrorDetail, ErrorObject, PayloadKey};
pub use envelope::{parse_envelope, EmptyData, Envelope, InboundEnvelope, Rejection};
pub use script::{build_script, DEFAULT_EVENT_NAME};
