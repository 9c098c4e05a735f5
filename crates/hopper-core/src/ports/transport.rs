//! Transport port: the capability set this engine needs from a pub/sub
//! client.
//!
//! Real brokers (Kafka, NATS, ...) own connections, partition assignment and
//! offset storage; this trait only exposes the five operations the routing
//! engine touches. Implementations are swappable, not subclassed.

use async_trait::async_trait;

use crate::domain::{BrokerError, Header, InboundMessage};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Open producer/consumer connections.
    async fn connect(&self) -> Result<(), BrokerError>;

    /// Close connections, flushing pending acknowledgements.
    async fn disconnect(&self) -> Result<(), BrokerError>;

    /// Publish one message and await the broker acknowledgement.
    async fn produce(
        &self,
        topic: &str,
        key: &[u8],
        value: &[u8],
        headers: &[Header],
    ) -> Result<(), BrokerError>;

    /// Await the next message from the subscribed stream.
    ///
    /// `None` means the stream has ended and the consumer loop should stop.
    async fn next(&self) -> Option<InboundMessage>;

    /// Commit consumer progress past the last message returned by `next`.
    async fn commit(&self) -> Result<(), BrokerError>;
}
