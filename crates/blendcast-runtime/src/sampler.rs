//! Sampling tick
//!
//! Reads the tracking source, feeds the body-point overlay, estimates
//! head orientation and commits the encoded record together with the
//! raw frame it came from.

use blendcast_core::RawFrame;
use blendcast_visual::{
    BodyPointDetector, BodyPointOverlay, EstimatorInput, MarkerSurface, NoBodyDetector, NullSurface,
    OrientationEstimator,
};
use blendcast_wire::{Record, RecordEncoder};

use crate::{OverlayConfig, PipelineState, StatsCounters, TrackingSource};

/// Body-point detector together with the overlay it drives
pub struct OverlayStage<S: MarkerSurface, D: BodyPointDetector> {
    overlay: BodyPointOverlay<S>,
    detector: D,
}

impl<S: MarkerSurface, D: BodyPointDetector> OverlayStage<S, D> {
    pub fn new(surface: S, detector: D, config: &OverlayConfig) -> Self {
        Self {
            overlay: BodyPointOverlay::new(surface, config.view(), config.marker_diameter),
            detector,
        }
    }

    pub fn process(&mut self, frame: &RawFrame) {
        self.overlay.process_frame(&mut self.detector, frame);
    }

    pub fn clear(&mut self) {
        self.overlay.clear();
    }

    pub fn overlay(&self) -> &BodyPointOverlay<S> {
        &self.overlay
    }
}

impl OverlayStage<NullSurface, NoBodyDetector> {
    /// Overlay that never draws anything
    pub fn null() -> Self {
        Self::new(NullSurface, NoBodyDetector, &OverlayConfig::default())
    }
}

/// What one sampling tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleOutcome {
    Committed(Record),
    /// No expression frame this tick; state left untouched
    TrackingGap,
}

/// Owns everything the sampling tick touches
pub struct Sampler<Src, E, S, D>
where
    Src: TrackingSource,
    E: OrientationEstimator,
    S: MarkerSurface,
    D: BodyPointDetector,
{
    source: Src,
    estimator: E,
    encoder: RecordEncoder,
    overlay: Option<OverlayStage<S, D>>,
}

impl<Src, E, S, D> Sampler<Src, E, S, D>
where
    Src: TrackingSource,
    E: OrientationEstimator,
    S: MarkerSurface,
    D: BodyPointDetector,
{
    /// `overlay` is `None` when the overlay is disabled
    pub fn new(source: Src, estimator: E, encoder: RecordEncoder, overlay: Option<OverlayStage<S, D>>) -> Self {
        Self {
            source,
            estimator,
            encoder,
            overlay,
        }
    }

    pub fn sample(&mut self, state: &PipelineState, counters: &StatsCounters) -> SampleOutcome {
        if let Some(stage) = self.overlay.as_mut() {
            if let Some(snapshot) = self.source.rendered_snapshot() {
                stage.process(&snapshot);
            }
        }

        let Some(expression) = self.source.current_expression_frame() else {
            tracing::debug!("no expression frame this tick");
            counters.tracking_gaps.inc();
            return SampleOutcome::TrackingGap;
        };

        let frame = self.source.current_raw_frame();
        let transform = self.source.current_head_transform();
        let orientation = self.estimator.estimate(&EstimatorInput {
            head_transform: transform.as_ref(),
            frame: frame.as_ref(),
        });

        let record = self.encoder.encode(&expression, orientation);
        state.commit_sample(record.clone(), frame);
        counters.samples.inc();
        SampleOutcome::Committed(record)
    }

    /// Remove every overlay marker
    pub fn clear_overlay(&mut self) {
        if let Some(stage) = self.overlay.as_mut() {
            stage.clear();
        }
    }

    pub fn overlay(&self) -> Option<&OverlayStage<S, D>> {
        self.overlay.as_ref()
    }

    pub fn source(&self) -> &Src {
        &self.source
    }
}
