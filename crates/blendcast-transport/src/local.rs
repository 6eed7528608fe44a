//! In-process transport
//!
//! Each channel is a `tokio::sync::broadcast` sender. Subscribers that
//! fall behind lose the oldest envelopes (`RecvError::Lagged`).

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use blendcast_core::ChannelId;
use blendcast_wire::MessageEnvelope;

use crate::{DeliveryStatus, Transport};

/// Default per-subscriber backlog
pub const DEFAULT_LOCAL_CAPACITY: usize = 64;

struct LocalChannel {
    sender: broadcast::Sender<MessageEnvelope>,
    next_sequence: u64,
}

/// Broadcast transport for embedding and tests
pub struct LocalTransport {
    capacity: usize,
    channels: Mutex<HashMap<ChannelId, LocalChannel>>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOCAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to a channel, creating it on first use
    pub fn subscribe(&self, channel: &ChannelId) -> broadcast::Receiver<MessageEnvelope> {
        let mut channels = self.channels.lock();
        let capacity = self.capacity;
        channels
            .entry(channel.clone())
            .or_insert_with(|| LocalChannel {
                sender: broadcast::channel(capacity).0,
                next_sequence: 0,
            })
            .sender
            .subscribe()
    }

    /// Number of live receivers on a channel
    pub fn subscriber_count(&self, channel: &ChannelId) -> usize {
        self.channels
            .lock()
            .get(channel)
            .map(|c| c.sender.receiver_count())
            .unwrap_or(0)
    }

    fn send(&self, channel: &ChannelId, text: &str) -> DeliveryStatus {
        let mut channels = self.channels.lock();
        let Some(state) = channels.get_mut(channel) else {
            return DeliveryStatus::NoSubscribers;
        };

        let envelope = MessageEnvelope::new(channel.clone(), state.next_sequence, text);
        match state.sender.send(envelope) {
            Ok(recipients) => {
                state.next_sequence += 1;
                DeliveryStatus::Delivered { recipients }
            }
            // Every receiver was dropped
            Err(_) => DeliveryStatus::NoSubscribers,
        }
    }
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LocalTransport {
    async fn publish(&self, channel: &ChannelId, text: &str) -> DeliveryStatus {
        self.send(channel, text)
    }
}
