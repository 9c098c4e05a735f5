//! Wire envelope: `{"data": ..., "metadata": ...}` as UTF-8 JSON.
//!
//! `data` is the business payload and is opaque to the routing engine;
//! `metadata` accumulates one timestamp entry per topic hop plus the latest
//! `"error"` string.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Metadata key holding the latest failure. Overwritten on each failure,
/// never accumulated.
pub const ERROR_KEY: &str = "error";

/// Envelope bytes were not valid JSON.
///
/// Such a message cannot be re-enveloped for a retry hop; the caller commits
/// it as-is and surfaces the loss.
#[derive(Debug, Error)]
#[error("envelope decode failed: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// An envelope could not be serialized for production.
#[derive(Debug, Error)]
#[error("envelope encode failed: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// Lenient field decode: absent or explicit `null` becomes an empty map, so a
/// sloppy producer's `"data": null` does not eject the message from the retry
/// chain.
fn null_as_empty_map<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The two-part wire structure wrapping every message payload.
///
/// Field order matters: serde serializes in declaration order, giving the
/// canonical `data`-then-`metadata` key order on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, deserialize_with = "null_as_empty_map")]
    pub data: Map<String, Value>,

    #[serde(default, deserialize_with = "null_as_empty_map")]
    pub metadata: Map<String, Value>,
}

impl Envelope {
    pub fn new(data: Map<String, Value>, metadata: Map<String, Value>) -> Self {
        Self { data, metadata }
    }

    /// Serialize to UTF-8 JSON bytes.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Lenient decode: a missing `data` or `metadata` key becomes an empty
    /// map, so payloads from non-conforming producers still route.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Record that the message passed through `topic` at `now`.
    ///
    /// The key is the lowercase topic name, the value an RFC 3339 UTC
    /// timestamp.
    pub fn stamp(&mut self, topic: &str, now: DateTime<Utc>) {
        self.metadata.insert(
            topic.to_lowercase(),
            Value::String(now.to_rfc3339_opts(SecondsFormat::Micros, false)),
        );
    }

    /// Record the latest failure, replacing any previous one.
    pub fn set_error(&mut self, error: impl Into<String>) {
        self.metadata
            .insert(ERROR_KEY.to_string(), Value::String(error.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn round_trip_preserves_data_and_metadata() {
        let env = Envelope::new(
            map(json!({"orderId": 42, "nested": {"a": [1, 2]}})),
            map(json!({"orders": "2025-08-13T12:00:00+00:00"})),
        );

        let bytes = env.encode().unwrap();
        let back = Envelope::decode(&bytes).unwrap();
        assert_eq!(back, env);
    }

    #[test]
    fn encode_emits_data_then_metadata() {
        let env = Envelope::new(map(json!({"k": 1})), map(json!({"m": "v"})));
        let text = String::from_utf8(env.encode().unwrap()).unwrap();
        assert_eq!(text, r#"{"data":{"k":1},"metadata":{"m":"v"}}"#);
    }

    #[test]
    fn decode_known_shape() {
        let bytes = br#"{"data": {"some": "data"}, "metadata": {"some": "metadata"}}"#;
        let env = Envelope::decode(bytes).unwrap();
        assert_eq!(env.data, map(json!({"some": "data"})));
        assert_eq!(env.metadata, map(json!({"some": "metadata"})));
    }

    #[test]
    fn decode_substitutes_empty_maps_for_missing_keys() {
        let env = Envelope::decode(br#"{}"#).unwrap();
        assert!(env.data.is_empty());
        assert!(env.metadata.is_empty());

        let env = Envelope::decode(br#"{"data": {"x": 1}}"#).unwrap();
        assert_eq!(env.data, map(json!({"x": 1})));
        assert!(env.metadata.is_empty());
    }

    #[test]
    fn decode_treats_explicit_null_as_empty_map() {
        let env = Envelope::decode(br#"{"data": null, "metadata": null}"#).unwrap();
        assert!(env.data.is_empty());
        assert!(env.metadata.is_empty());

        let env = Envelope::decode(br#"{"data": null, "metadata": {"m": "v"}}"#).unwrap();
        assert!(env.data.is_empty());
        assert_eq!(env.metadata, map(json!({"m": "v"})));
    }

    #[test]
    fn decode_rejects_malformed_bytes() {
        assert!(Envelope::decode(b"not json").is_err());
        assert!(Envelope::decode(b"").is_err());
    }

    #[test]
    fn stamp_uses_lowercase_topic_and_utc_timestamp() {
        let mut env = Envelope::default();
        let now = Utc.with_ymd_and_hms(2025, 8, 13, 12, 0, 0).unwrap();

        env.stamp("ORDERS", now);

        let value = env.metadata.get("orders").unwrap().as_str().unwrap();
        assert_eq!(value, "2025-08-13T12:00:00.000000+00:00");
    }

    #[test]
    fn stamping_two_topics_keeps_both_entries() {
        let mut env = Envelope::default();
        let now = Utc::now();
        env.stamp("ORDERS", now);
        env.stamp("ORDERS-RETRY-1", now);

        assert!(env.metadata.contains_key("orders"));
        assert!(env.metadata.contains_key("orders-retry-1"));
        assert_eq!(env.metadata.len(), 2);
    }

    #[test]
    fn set_error_overwrites_previous_error() {
        let mut env = Envelope::default();
        env.set_error("first failure");
        env.set_error("second failure");

        assert_eq!(env.metadata.get(ERROR_KEY).unwrap(), "second failure");
        assert_eq!(env.metadata.len(), 1);
    }
}
