//! UDP transport implementation
//!
//! Every channel keeps its own subscriber list and sequence counter.
//! A publish sends one enveloped datagram per subscriber.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use blendcast_core::{BlendcastError, BlendcastResult, ChannelId};
use blendcast_wire::{MessageEnvelope, MAX_ENVELOPE_SIZE};

use crate::{DeliveryStatus, Transport};

#[derive(Debug, Default)]
struct ChannelState {
    subscribers: Vec<SocketAddr>,
    next_sequence: u64,
}

/// UDP fan-out transport
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    channels: RwLock<HashMap<ChannelId, ChannelState>>,
}

impl UdpTransport {
    /// Bind to a local address
    pub async fn bind(addr: SocketAddr) -> BlendcastResult<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| BlendcastError::Transport(e.to_string()))?;

        let local_addr = socket
            .local_addr()
            .map_err(|e| BlendcastError::Transport(e.to_string()))?;

        Ok(UdpTransport {
            socket: Arc::new(socket),
            local_addr,
            channels: RwLock::new(HashMap::new()),
        })
    }

    /// Get local address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Add a subscriber; returns false if it was already subscribed
    pub fn subscribe(&self, channel: &ChannelId, addr: SocketAddr) -> bool {
        let mut channels = self.channels.write();
        let state = channels.entry(channel.clone()).or_default();
        if state.subscribers.contains(&addr) {
            return false;
        }
        state.subscribers.push(addr);
        tracing::info!("{} subscribed to {}", addr, channel);
        true
    }

    /// Remove a subscriber; returns false if it was not subscribed
    pub fn unsubscribe(&self, channel: &ChannelId, addr: SocketAddr) -> bool {
        let mut channels = self.channels.write();
        let Some(state) = channels.get_mut(channel) else {
            return false;
        };
        let before = state.subscribers.len();
        state.subscribers.retain(|a| *a != addr);
        before != state.subscribers.len()
    }

    /// Current subscribers of a channel
    pub fn subscribers(&self, channel: &ChannelId) -> Vec<SocketAddr> {
        self.channels
            .read()
            .get(channel)
            .map(|state| state.subscribers.clone())
            .unwrap_or_default()
    }

    /// Send an envelope to a single destination
    pub async fn send_envelope_to(&self, envelope: &MessageEnvelope, dest: SocketAddr) -> BlendcastResult<()> {
        let bytes = envelope.encode()?;
        self.socket
            .send_to(&bytes, dest)
            .await
            .map_err(|e| BlendcastError::Transport(e.to_string()))?;
        Ok(())
    }

    /// Receive one envelope
    pub async fn recv_envelope(&self) -> BlendcastResult<(MessageEnvelope, SocketAddr)> {
        let mut buf = vec![0u8; MAX_ENVELOPE_SIZE];
        let (len, addr) = self
            .socket
            .recv_from(&mut buf)
            .await
            .map_err(|e| BlendcastError::Transport(e.to_string()))?;

        let envelope = MessageEnvelope::decode(&buf[..len])?;
        Ok((envelope, addr))
    }

    /// Get a clone of the socket for concurrent operations
    pub fn socket(&self) -> Arc<UdpSocket> {
        Arc::clone(&self.socket)
    }

    /// Snapshot subscribers and claim the next sequence number
    fn prepare(&self, channel: &ChannelId) -> Option<(Vec<SocketAddr>, u64)> {
        let mut channels = self.channels.write();
        let state = channels.get_mut(channel)?;
        if state.subscribers.is_empty() {
            return None;
        }
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        Some((state.subscribers.clone(), sequence))
    }
}

impl Transport for UdpTransport {
    async fn publish(&self, channel: &ChannelId, text: &str) -> DeliveryStatus {
        let Some((subscribers, sequence)) = self.prepare(channel) else {
            return DeliveryStatus::NoSubscribers;
        };

        let envelope = MessageEnvelope::new(channel.clone(), sequence, text);
        let bytes = match envelope.encode() {
            Ok(bytes) => bytes,
            Err(e) => return DeliveryStatus::Failed(e.to_string()),
        };

        let mut recipients = 0;
        let mut last_error = None;
        for dest in &subscribers {
            match self.socket.send_to(&bytes, *dest).await {
                Ok(_) => recipients += 1,
                Err(e) => {
                    tracing::warn!("UDP send to {} failed: {}", dest, e);
                    last_error = Some(e.to_string());
                }
            }
        }

        match (recipients, last_error) {
            (0, Some(reason)) => DeliveryStatus::Failed(reason),
            (recipients, _) => DeliveryStatus::Delivered { recipients },
        }
    }
}

/// Envelope receiver channel
pub type EnvelopeReceiver = mpsc::Receiver<(MessageEnvelope, SocketAddr)>;

/// Start a background receive loop. Undecodable datagrams are logged
/// and dropped.
pub fn start_receive_loop(socket: Arc<UdpSocket>, buffer_size: usize) -> EnvelopeReceiver {
    let (tx, rx) = mpsc::channel(buffer_size);

    tokio::spawn(async move {
        let mut buf = vec![0u8; MAX_ENVELOPE_SIZE];
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, addr)) => match MessageEnvelope::decode(&buf[..len]) {
                    Ok(envelope) => {
                        if tx.send((envelope, addr)).await.is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => {
                        tracing::warn!("dropping datagram from {}: {}", addr, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("UDP receive error: {}", e);
                }
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[tokio::test]
    async fn test_udp_transport_bind() {
        let transport = UdpTransport::bind(loopback()).await.unwrap();

        assert_ne!(transport.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent() {
        let transport = UdpTransport::bind(loopback()).await.unwrap();
        let channel = ChannelId::from("faces");
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();

        assert!(transport.subscribe(&channel, addr));
        assert!(!transport.subscribe(&channel, addr));
        assert_eq!(transport.subscribers(&channel), vec![addr]);
        assert!(transport.unsubscribe(&channel, addr));
        assert!(!transport.unsubscribe(&channel, addr));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let transport = UdpTransport::bind(loopback()).await.unwrap();
        let status = transport.publish(&ChannelId::from("faces"), "0.1").await;
        assert_eq!(status, DeliveryStatus::NoSubscribers);
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let publisher = UdpTransport::bind(loopback()).await.unwrap();
        let listener = UdpTransport::bind(loopback()).await.unwrap();
        let channel = ChannelId::from("faces");
        publisher.subscribe(&channel, listener.local_addr());

        let mut rx = start_receive_loop(listener.socket(), 8);

        assert!(publisher.publish(&channel, "0.5,0.25").await.is_delivered());
        assert!(publisher.publish(&channel, "0.5,0.75").await.is_delivered());

        let (first, from) = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(from, publisher.local_addr());
        assert_eq!(first.channel, channel);
        assert_eq!(first.sequence, 0);
        assert_eq!(first.body, "0.5,0.25");

        let (second, _) = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.sequence, 1);
    }
}
