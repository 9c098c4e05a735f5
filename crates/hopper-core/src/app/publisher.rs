//! Producing side: envelope assembly and publication.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::correlation::CorrelationContext;
use crate::domain::{BrokerError, Envelope, MessageKey};
use crate::ports::{Clock, Transport};

/// Publishes envelopes to the transport.
///
/// Every produced message gets a fresh timestamp entry for its destination
/// topic, the publisher-wide common metadata, then the per-call metadata —
/// later entries win, so a retry hop's carried-over history (including the
/// `"error"` entry) survives the merge.
pub struct Publisher {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    common_metadata: Option<Map<String, Value>>,
}

impl Publisher {
    pub fn new(transport: Arc<dyn Transport>, clock: Arc<dyn Clock>) -> Self {
        Self {
            transport,
            clock,
            common_metadata: None,
        }
    }

    /// Attach metadata merged into every produced envelope (e.g. service
    /// name, environment).
    pub fn with_common_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.common_metadata = Some(metadata);
        self
    }

    /// Produce one message to `topic`.
    ///
    /// `data` is passed through untouched; `metadata` is whatever accumulated
    /// history the caller carries forward (empty for first production).
    /// Correlation headers are attached iff `ctx` is bound.
    pub async fn produce(
        &self,
        topic: &str,
        key: MessageKey,
        data: Map<String, Value>,
        metadata: Map<String, Value>,
        ctx: &CorrelationContext,
    ) -> Result<(), BrokerError> {
        let mut envelope = Envelope::new(data, Map::new());
        envelope.stamp(topic, self.clock.now());
        if let Some(common) = &self.common_metadata {
            envelope.metadata.extend(common.clone());
        }
        envelope.metadata.extend(metadata);

        let value = envelope.encode()?;
        self.transport
            .produce(topic, key.as_bytes(), &value, &ctx.to_headers())
            .await?;

        tracing::info!(
            topic,
            key = %String::from_utf8_lossy(key.as_bytes()),
            "produced message"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryTransport;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn publisher(transport: Arc<InMemoryTransport>) -> Publisher {
        let clock = FixedClock(Utc.with_ymd_and_hms(2025, 8, 13, 12, 0, 0).unwrap());
        Publisher::new(transport, Arc::new(clock))
    }

    #[tokio::test]
    async fn produce_stamps_destination_topic() {
        let transport = Arc::new(InMemoryTransport::new());
        let publisher = publisher(Arc::clone(&transport));

        publisher
            .produce(
                "ORDERS",
                MessageKey::from("test"),
                map(json!({"orderId": 42})),
                Map::new(),
                &CorrelationContext::empty(),
            )
            .await
            .unwrap();

        let produced = transport.produced().await;
        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].topic, "ORDERS");
        assert_eq!(produced[0].key, b"test");

        let envelope = Envelope::decode(&produced[0].value).unwrap();
        assert_eq!(envelope.data, map(json!({"orderId": 42})));
        assert_eq!(
            envelope.metadata.get("orders").unwrap(),
            "2025-08-13T12:00:00.000000+00:00"
        );
        assert!(produced[0].headers.is_empty());
    }

    #[tokio::test]
    async fn per_call_metadata_wins_over_common_metadata() {
        let transport = Arc::new(InMemoryTransport::new());
        let publisher = publisher(Arc::clone(&transport))
            .with_common_metadata(map(json!({"service": "billing", "env": "test"})));

        publisher
            .produce(
                "ORDERS",
                MessageKey::from("k"),
                Map::new(),
                map(json!({"env": "override", "error": "boom"})),
                &CorrelationContext::empty(),
            )
            .await
            .unwrap();

        let produced = transport.produced().await;
        let envelope = Envelope::decode(&produced[0].value).unwrap();
        assert_eq!(envelope.metadata.get("service").unwrap(), "billing");
        assert_eq!(envelope.metadata.get("env").unwrap(), "override");
        assert_eq!(envelope.metadata.get("error").unwrap(), "boom");
        assert!(envelope.metadata.contains_key("orders"));
    }

    #[tokio::test]
    async fn bound_context_attaches_correlation_header() {
        let transport = Arc::new(InMemoryTransport::new());
        let publisher = publisher(Arc::clone(&transport));

        publisher
            .produce(
                "ORDERS",
                MessageKey::from("k"),
                Map::new(),
                Map::new(),
                &CorrelationContext::bound("abc"),
            )
            .await
            .unwrap();

        let produced = transport.produced().await;
        assert_eq!(
            produced[0].headers,
            vec![("X-Correlation-ID".to_string(), b"abc".to_vec())]
        );
    }
}
