//! In-memory transport for development and tests.
//!
//! Single consumer, no partitions: an inbox of messages, a log of produced
//! records, and a commit counter. `loopback` mode feeds produced messages
//! straight back into the inbox, which is enough to drive a full
//! retry-escalation chain inside one process.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::domain::{BrokerError, Header, InboundMessage};
use crate::ports::Transport;

/// One record captured by `produce`, for inspection in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducedRecord {
    pub topic: String,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub headers: Vec<Header>,
}

struct TransportState {
    inbox: VecDeque<InboundMessage>,
    produced: Vec<ProducedRecord>,
    commits: u64,
    connected: bool,
    closed: bool,
}

pub struct InMemoryTransport {
    state: Mutex<TransportState>,
    notify: Notify,
    loopback: bool,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::with_loopback(false)
    }

    /// Transport that re-delivers every produced message on its own stream.
    pub fn with_loopback(loopback: bool) -> Self {
        Self {
            state: Mutex::new(TransportState {
                inbox: VecDeque::new(),
                produced: Vec::new(),
                commits: 0,
                connected: false,
                closed: false,
            }),
            notify: Notify::new(),
            loopback,
        }
    }

    /// Seed the consumer stream with one message.
    pub async fn push_inbound(&self, message: InboundMessage) {
        let mut state = self.state.lock().await;
        state.inbox.push_back(message);
        drop(state);
        self.notify.notify_one();
    }

    /// End the stream: once the inbox drains, `next` returns `None`.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        state.closed = true;
        drop(state);
        self.notify.notify_waiters();
    }

    pub async fn produced(&self) -> Vec<ProducedRecord> {
        self.state.lock().await.produced.clone()
    }

    pub async fn commit_count(&self) -> u64 {
        self.state.lock().await.commits
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.connected
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn connect(&self) -> Result<(), BrokerError> {
        self.state.lock().await.connected = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        self.state.lock().await.connected = false;
        Ok(())
    }

    async fn produce(
        &self,
        topic: &str,
        key: &[u8],
        value: &[u8],
        headers: &[Header],
    ) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        state.produced.push(ProducedRecord {
            topic: topic.to_string(),
            key: key.to_vec(),
            value: value.to_vec(),
            headers: headers.to_vec(),
        });
        if self.loopback {
            state.inbox.push_back(InboundMessage {
                topic: topic.to_string(),
                key: key.to_vec(),
                value: value.to_vec(),
                headers: headers.to_vec(),
            });
            drop(state);
            self.notify.notify_one();
        }
        Ok(())
    }

    async fn next(&self) -> Option<InboundMessage> {
        loop {
            {
                let mut state = self.state.lock().await;
                if let Some(message) = state.inbox.pop_front() {
                    return Some(message);
                }
                if state.closed {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    async fn commit(&self) -> Result<(), BrokerError> {
        self.state.lock().await.commits += 1;
        Ok(())
    }
}
