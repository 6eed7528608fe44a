//! Change gate and dispatcher
//!
//! On every message tick the current record is compared with the last
//! one handed to the transport. Only a changed, non-blank record is
//! published. The last-dispatched slot is updated before the publish is
//! attempted and is never rolled back, so a failed publish is not
//! retried until the record changes again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use blendcast_core::{BlendcastError, ChannelId};
use blendcast_transport::{DeliveryStatus, Transport};
use blendcast_wire::Record;

use crate::{PipelineState, StatsCounters};

/// Outcome of one message tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Nothing sampled yet; the overlay is cleared
    Blank,
    /// Same bytes as the last dispatched record
    Unchanged,
    /// New record, already marked as dispatched
    Dispatch(Record),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeGate;

impl ChangeGate {
    pub fn evaluate(&self, state: &PipelineState) -> GateDecision {
        let decision = state.gate_for_dispatch();
        match &decision {
            GateDecision::Blank => tracing::debug!("no record yet, skipping publish"),
            GateDecision::Unchanged => tracing::debug!("record unchanged, skipping publish"),
            GateDecision::Dispatch(record) => tracing::debug!("record changed ({} bytes)", record.len()),
        }
        decision
    }
}

/// Fire-and-forget publisher
pub struct Dispatcher<T: Transport> {
    transport: Arc<T>,
    channel: ChannelId,
    timeout: Duration,
    counters: Arc<StatsCounters>,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: Arc<T>, channel: ChannelId, timeout: Duration, counters: Arc<StatsCounters>) -> Self {
        Self {
            transport,
            channel,
            timeout,
            counters,
        }
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Spawn the publish onto `jobs` and return immediately
    pub fn dispatch(&self, record: Record, jobs: &mut JoinSet<()>) {
        self.counters.dispatched.inc();

        let transport = Arc::clone(&self.transport);
        let channel = self.channel.clone();
        let timeout = self.timeout;
        let counters = Arc::clone(&self.counters);

        jobs.spawn(async move {
            match tokio::time::timeout(timeout, transport.publish(&channel, record.as_str())).await {
                Ok(DeliveryStatus::Delivered { recipients }) => {
                    tracing::debug!("record delivered to {} on {}", recipients, channel);
                }
                Ok(DeliveryStatus::NoSubscribers) => {
                    tracing::debug!("no subscribers on {}", channel);
                }
                Ok(DeliveryStatus::Failed(reason)) => {
                    counters.publish_failures.inc();
                    tracing::warn!("publish on {} failed: {}", channel, reason);
                }
                Err(_) => {
                    counters.publish_failures.inc();
                    tracing::warn!("publish on {} failed: {}", channel, BlendcastError::PublishTimeout(timeout));
                }
            }
        });
    }
}
