//! Wire-level message types shared by the transport port and the loop.

/// A single message header: name + raw bytes value.
pub type Header = (String, Vec<u8>);

/// Message key as accepted from callers.
///
/// Text keys are encoded to UTF-8 on the wire; byte keys pass through
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKey {
    Text(String),
    Bytes(Vec<u8>),
}

impl MessageKey {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            MessageKey::Text(s) => s.as_bytes(),
            MessageKey::Bytes(b) => b,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            MessageKey::Text(s) => s.into_bytes(),
            MessageKey::Bytes(b) => b,
        }
    }
}

impl From<&str> for MessageKey {
    fn from(s: &str) -> Self {
        MessageKey::Text(s.to_string())
    }
}

impl From<String> for MessageKey {
    fn from(s: String) -> Self {
        MessageKey::Text(s)
    }
}

impl From<Vec<u8>> for MessageKey {
    fn from(b: Vec<u8>) -> Self {
        MessageKey::Bytes(b)
    }
}

/// One message pulled from the transport stream.
///
/// This is the raw record handed to user handlers; the engine itself only
/// decodes `value` when it has to build a retry hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub headers: Vec<Header>,
}
