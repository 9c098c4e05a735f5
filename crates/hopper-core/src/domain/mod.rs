//! Domain model: topic shapes, wire envelope, message types, errors.

pub mod envelope;
pub mod errors;
pub mod message;
pub mod topic;

pub use envelope::{DecodeError, ERROR_KEY, EncodeError, Envelope};
pub use errors::BrokerError;
pub use message::{Header, InboundMessage, MessageKey};
pub use topic::{DLQ_MARKER, MalformedTopicError, RETRY_MARKER, TopicKind, next_hop};
