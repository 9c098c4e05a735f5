//! Topic name state machine: Base -> Retry-1 .. Retry-N -> DLQ -> terminal.
//!
//! Marker strings are wire constants shared with existing deployments; do not
//! change them without a topic migration.

use thiserror::Error;

/// Separates a base topic name from its numeric retry attempt.
pub const RETRY_MARKER: &str = "-RETRY-";

/// Suffix of the terminal dead-letter topic.
pub const DLQ_MARKER: &str = "-DLQ";

/// The three recognized topic shapes.
///
/// Parsing happens once per routing decision; everything downstream matches on
/// the variant instead of re-probing the string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    /// Plain topic, e.g. `ORDERS`.
    Base,

    /// Retry hop with a 1-based attempt count, e.g. `ORDERS-RETRY-2`.
    Retry(u32),

    /// Dead-letter topic, e.g. `ORDERS-DLQ`. No further routing.
    DeadLetter,
}

/// A retry topic carried a suffix that is not a positive integer.
///
/// This is a configuration/data error, not a handler failure: the next hop
/// cannot be computed, so the caller must treat the message as exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed topic {topic:?}: retry suffix {suffix:?} is not a positive integer")]
pub struct MalformedTopicError {
    pub topic: String,
    pub suffix: String,
}

impl TopicKind {
    /// Parse a topic name into `(base_name, kind)`.
    ///
    /// The DLQ suffix is checked first so `X-DLQ` never reads as a retry
    /// topic; the two markers cannot legally occur in one name.
    pub fn parse(topic: &str) -> Result<(&str, TopicKind), MalformedTopicError> {
        if let Some(base) = topic.strip_suffix(DLQ_MARKER) {
            return Ok((base, TopicKind::DeadLetter));
        }

        if let Some(pos) = topic.find(RETRY_MARKER) {
            let base = &topic[..pos];
            let suffix = &topic[pos + RETRY_MARKER.len()..];
            let attempt = suffix
                .parse::<u32>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| MalformedTopicError {
                    topic: topic.to_string(),
                    suffix: suffix.to_string(),
                })?;
            return Ok((base, TopicKind::Retry(attempt)));
        }

        Ok((topic, TopicKind::Base))
    }
}

/// Compute the next destination for a failed message.
///
/// - `Ok(Some(topic))`: re-publish there.
/// - `Ok(None)`: terminal — the message already sits in a DLQ.
/// - `Err(_)`: unparseable retry suffix; cannot route.
///
/// A budget of zero sends the first failure straight to the DLQ, so
/// `retry_max_times` is always the exact number of retry hops a message can
/// take.
pub fn next_hop(topic: &str, retry_max_times: u32) -> Result<Option<String>, MalformedTopicError> {
    let (base, kind) = TopicKind::parse(topic)?;

    let next = match kind {
        TopicKind::Base if retry_max_times == 0 => Some(format!("{base}{DLQ_MARKER}")),
        TopicKind::Base => Some(format!("{base}{RETRY_MARKER}1")),
        TopicKind::Retry(attempt) if attempt < retry_max_times => {
            Some(format!("{base}{RETRY_MARKER}{}", attempt + 1))
        }
        TopicKind::Retry(_) => Some(format!("{base}{DLQ_MARKER}")),
        TopicKind::DeadLetter => None,
    };

    Ok(next)
}
