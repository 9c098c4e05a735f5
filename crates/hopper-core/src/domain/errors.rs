use thiserror::Error;

use super::envelope::{DecodeError, EncodeError};
use super::topic::MalformedTopicError;

/// Engine-wide error taxonomy.
///
/// `Handler`, `MalformedTopic` and `Decode` are contained within one message's
/// processing cycle and never abort the consumer loop. `Transport` propagates
/// upward: connection retry/backoff belongs to the transport adapter, not this
/// engine.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("handler failed: {0}")]
    Handler(String),

    #[error(transparent)]
    MalformedTopic(#[from] MalformedTopicError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("transport: {0}")]
    Transport(String),

    #[error("config: {0}")]
    Config(String),
}

impl BrokerError {
    /// Convenience for handler implementations wrapping arbitrary failures.
    pub fn handler(err: impl std::fmt::Display) -> Self {
        BrokerError::Handler(err.to_string())
    }
}
