//! Consume -> dispatch -> retry -> commit loop.
//!
//! Per message: pull from the transport, extract the correlation context,
//! invoke the user handler, and on failure route the original envelope to the
//! next retry/DLQ topic. Commit runs exactly once on every path out of
//! dispatch, so the consumer never re-reads a message it has already handled
//! or rerouted.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::app::publisher::Publisher;
use crate::correlation::CorrelationContext;
use crate::domain::{BrokerError, Envelope, InboundMessage, MessageKey, next_hop};
use crate::ports::{Clock, Transport};

/// User-supplied message handler.
///
/// The engine only distinguishes error from no-error; the error's string
/// representation ends up in the retry envelope's metadata.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(
        &self,
        message: &InboundMessage,
        ctx: &CorrelationContext,
    ) -> Result<(), BrokerError>;
}

/// One logical consumer instance.
///
/// Processes messages strictly one at a time; throughput scaling is done by
/// running more instances under the transport's consumer-group semantics, not
/// by fanning out here.
pub struct ConsumerLoop {
    transport: Arc<dyn Transport>,
    publisher: Publisher,
    retry_max_times: u32,
    retry_delay: Duration,
}

impl ConsumerLoop {
    pub fn new(
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        retry_max_times: u32,
        retry_delay: Duration,
    ) -> Self {
        let publisher = Publisher::new(Arc::clone(&transport), clock);
        Self {
            transport,
            publisher,
            retry_max_times,
            retry_delay,
        }
    }

    /// Run until the stream ends or shutdown is signalled.
    ///
    /// Handler, routing and decode failures are contained per message and
    /// never abort the loop; transport failures propagate (after the commit
    /// for the current message has been attempted).
    pub async fn run(
        &self,
        handler: Arc<dyn MessageHandler>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Result<(), BrokerError> {
        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let message = tokio::select! {
                changed = shutdown_rx.changed() => {
                    // A dropped sender counts as a shutdown request.
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                next = self.transport.next() => match next {
                    Some(message) => message,
                    None => break,
                },
            };

            self.process_one(&message, handler.as_ref()).await?;
        }
        Ok(())
    }

    /// Full cycle for one message. Commit always runs; reroute and commit
    /// errors are surfaced only after both have been attempted.
    async fn process_one(
        &self,
        message: &InboundMessage,
        handler: &dyn MessageHandler,
    ) -> Result<(), BrokerError> {
        let ctx = CorrelationContext::from_headers(&message.headers);
        tracing::info!(
            topic = %message.topic,
            key = %String::from_utf8_lossy(&message.key),
            correlation_id = ctx.id().unwrap_or(""),
            "consumed message"
        );

        let dispatch_result = match handler.handle(message, &ctx).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::error!(
                    topic = %message.topic,
                    key = %String::from_utf8_lossy(&message.key),
                    error = %err,
                    "handler failed"
                );
                self.reroute(message, &err, &ctx).await
            }
        };

        let commit_result = self.transport.commit().await;
        if commit_result.is_ok() {
            tracing::info!(topic = %message.topic, "committed");
        }

        dispatch_result?;
        commit_result
    }

    /// Route a failed message to its next retry/DLQ topic.
    ///
    /// Malformed topics and undecodable envelopes are logged and treated as
    /// exhausted (the message leaves the retry chain at the commit); only
    /// transport/encode failures bubble up.
    async fn reroute(
        &self,
        message: &InboundMessage,
        failure: &BrokerError,
        ctx: &CorrelationContext,
    ) -> Result<(), BrokerError> {
        let next_topic = match next_hop(&message.topic, self.retry_max_times) {
            Ok(Some(topic)) => topic,
            Ok(None) => {
                tracing::warn!(
                    topic = %message.topic,
                    "retry budget exhausted at dead-letter topic, dropping from active processing"
                );
                return Ok(());
            }
            Err(err) => {
                tracing::error!(
                    topic = %message.topic,
                    error = %err,
                    "cannot compute next hop, committing without reroute"
                );
                return Ok(());
            }
        };

        let mut envelope = match Envelope::decode(&message.value) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::error!(
                    topic = %message.topic,
                    key = %String::from_utf8_lossy(&message.key),
                    error = %err,
                    "cannot re-envelope undecodable message, committing without reroute"
                );
                return Ok(());
            }
        };

        tracing::info!(
            topic = %message.topic,
            next_topic = %next_topic,
            delay_secs = self.retry_delay.as_secs(),
            "scheduling retry"
        );
        tokio::time::sleep(self.retry_delay).await;

        envelope.set_error(failure.to_string());
        self.publisher
            .produce(
                &next_topic,
                MessageKey::Bytes(message.key.clone()),
                envelope.data,
                envelope.metadata,
                ctx,
            )
            .await
    }
}
