use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use hopper_core::app::{ConsumerLoop, MessageHandler, Publisher};
use hopper_core::correlation::CorrelationContext;
use hopper_core::domain::{BrokerError, Envelope, InboundMessage, MessageKey};
use hopper_core::impls::InMemoryTransport;
use hopper_core::ports::{SystemClock, Transport};

/// Demo handler: fails the first `n` deliveries, then succeeds.
struct FlakyOrderHandler {
    remaining_failures: AtomicU32,
}

impl FlakyOrderHandler {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl MessageHandler for FlakyOrderHandler {
    async fn handle(
        &self,
        message: &InboundMessage,
        ctx: &CorrelationContext,
    ) -> Result<(), BrokerError> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(BrokerError::handler(format!(
                "intentional failure (left={left})"
            )));
        }

        let envelope = Envelope::decode(&message.value)?;
        println!(
            "handled order on {} (correlation_id={:?}): data={}",
            message.topic,
            ctx.id().unwrap_or("-"),
            serde_json::Value::Object(envelope.data),
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), BrokerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Loopback transport: every produced retry message is re-delivered on the
    // same stream, so one process shows the whole escalation chain.
    let transport = Arc::new(InMemoryTransport::with_loopback(true));
    transport.connect().await?;
    transport.close().await; // end the stream once everything drains

    let clock = Arc::new(SystemClock);
    let publisher = Publisher::new(transport.clone(), clock.clone());

    // Seed one order; the handler fails twice, so it lands on ORDERS-RETRY-2
    // before succeeding (budget 3 keeps the DLQ out of reach).
    publisher
        .produce(
            "ORDERS",
            MessageKey::from("order-42"),
            serde_json::json!({"orderId": 42})
                .as_object()
                .cloned()
                .unwrap_or_default(),
            serde_json::Map::new(),
            &CorrelationContext::generate(),
        )
        .await?;

    let consumer = ConsumerLoop::new(
        transport.clone(),
        clock,
        3,
        Duration::from_millis(200),
    );
    let (_shutdown_tx, mut shutdown_rx) = watch::channel(false);
    consumer
        .run(Arc::new(FlakyOrderHandler::new(2)), &mut shutdown_rx)
        .await?;

    println!("\nproduced topic trail:");
    for record in transport.produced().await {
        println!(
            "  {} key={}",
            record.topic,
            String::from_utf8_lossy(&record.key)
        );
    }
    println!("commits: {}", transport.commit_count().await);

    transport.disconnect().await?;
    Ok(())
}
