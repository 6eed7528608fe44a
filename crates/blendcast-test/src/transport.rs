//! Recording and failing transports

use std::time::Duration;

use parking_lot::Mutex;

use blendcast_core::ChannelId;
use blendcast_transport::{DeliveryStatus, Transport};

/// One publish seen by a fake transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub channel: ChannelId,
    pub text: String,
}

/// Records every publish and reports it delivered to one recipient
#[derive(Debug, Default)]
pub struct RecordingTransport {
    published: Mutex<Vec<Published>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.published.lock().iter().map(|p| p.text.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.published.lock().len()
    }
}

impl Transport for RecordingTransport {
    async fn publish(&self, channel: &ChannelId, text: &str) -> DeliveryStatus {
        self.published.lock().push(Published {
            channel: channel.clone(),
            text: text.to_string(),
        });
        DeliveryStatus::Delivered { recipients: 1 }
    }
}

/// How a `FailingTransport` misbehaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Report `Failed` immediately
    Refuse,
    /// Never complete within the given time
    Stall(Duration),
}

/// Counts attempts and never delivers
#[derive(Debug)]
pub struct FailingTransport {
    mode: FailureMode,
    attempts: Mutex<Vec<String>>,
}

impl FailingTransport {
    pub fn new(mode: FailureMode) -> Self {
        Self {
            mode,
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().clone()
    }
}

impl Transport for FailingTransport {
    async fn publish(&self, _channel: &ChannelId, text: &str) -> DeliveryStatus {
        self.attempts.lock().push(text.to_string());
        match self.mode {
            FailureMode::Refuse => DeliveryStatus::Failed("channel unavailable".into()),
            FailureMode::Stall(delay) => {
                tokio::time::sleep(delay).await;
                DeliveryStatus::Failed("stalled".into())
            }
        }
    }
}
