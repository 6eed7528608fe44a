//! End-to-end Session Scenarios
//!
//! Sessions wired to in-memory collaborators and driven on tokio's
//! paused clock:
//! - Change-gated publishing
//! - Paired artifact persistence
//! - Session restart and teardown
//! - Failure isolation (transport, store)

use std::sync::Arc;

use blendcast_core::BlendcastResult;
use blendcast_runtime::{OverlayStage, PipelineConfig, Session, TrackingSource};
use blendcast_visual::{AnyEstimator, NoFaceDetector};

use crate::{FixedBodyDetector, MemoryBlobStore, MemorySurface, RecordingTransport};

// ============================================================================
// HARNESS
// ============================================================================

/// Collaborators a test keeps handles to while a session runs
#[derive(Clone, Default)]
pub struct Harness {
    pub transport: Arc<RecordingTransport>,
    pub store: Arc<MemoryBlobStore>,
    pub surface: MemorySurface,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: MemoryBlobStore) -> Self {
        Self {
            store: Arc::new(store),
            ..Self::default()
        }
    }

    /// Start a session over `source` with this harness's collaborators
    pub async fn start<Src: TrackingSource>(&self, config: PipelineConfig, source: Src) -> BlendcastResult<Session> {
        let estimator = AnyEstimator::for_strategy(config.orientation_strategy, NoFaceDetector);
        let overlay = OverlayStage::new(self.surface.clone(), FixedBodyDetector::upright(), &config.overlay);
        Session::start(
            config,
            source,
            Arc::clone(&self.transport),
            Arc::clone(&self.store),
            estimator,
            overlay,
        )
        .await
    }
}

/// The record a neutral face at zero orientation encodes to
pub fn zero_record(fields: usize) -> String {
    vec!["0.000000"; fields].join(",")
}

// ============================================================================
// TESTS
// ============================================================================
