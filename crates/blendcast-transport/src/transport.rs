//! Publishing seam

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use blendcast_core::ChannelId;

/// Outcome of one publish attempt. Best effort: `Delivered` means the
/// message left this process, not that anyone read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered { recipients: usize },
    NoSubscribers,
    Failed(String),
}

impl DeliveryStatus {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered { .. })
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStatus::Delivered { recipients } => write!(f, "delivered to {}", recipients),
            DeliveryStatus::NoSubscribers => f.write_str("no subscribers"),
            DeliveryStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Publishes one text message to every current subscriber of a channel
pub trait Transport: Send + Sync + 'static {
    fn publish(&self, channel: &ChannelId, text: &str) -> impl Future<Output = DeliveryStatus> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    async fn publish(&self, channel: &ChannelId, text: &str) -> DeliveryStatus {
        (**self).publish(channel, text).await
    }
}
