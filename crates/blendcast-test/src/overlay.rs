//! Overlay fakes
//!
//! `MemorySurface` remembers what it drew. Clones share one log, so a
//! test can keep a clone while the session owns the surface.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use blendcast_core::{BlendcastResult, RawFrame};
use blendcast_visual::{BodyObservation, BodyPointDetector, Joint, MarkerSurface, NormalizedPoint, ViewPoint};

/// Detector that sees the same torso in every frame
#[derive(Debug, Clone)]
pub struct FixedBodyDetector {
    body: BodyObservation,
}

impl FixedBodyDetector {
    pub fn new(body: BodyObservation) -> Self {
        Self { body }
    }

    /// Neck and both shoulders around the middle of the frame, plus a
    /// wrist the overlay ignores
    pub fn upright() -> Self {
        Self::new(BodyObservation {
            points: vec![
                (Joint::Neck, NormalizedPoint::new(0.5, 0.7)),
                (Joint::LeftShoulder, NormalizedPoint::new(0.4, 0.65)),
                (Joint::RightShoulder, NormalizedPoint::new(0.6, 0.65)),
                (Joint::LeftWrist, NormalizedPoint::new(0.3, 0.2)),
            ],
        })
    }
}

impl BodyPointDetector for FixedBodyDetector {
    fn detect(&mut self, _frame: &RawFrame) -> BlendcastResult<Vec<BodyObservation>> {
        Ok(vec![self.body.clone()])
    }
}

/// A marker as last drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawnMarker {
    pub center: ViewPoint,
    pub diameter: f32,
}

#[derive(Debug, Default)]
struct SurfaceLog {
    next_id: u32,
    live: BTreeMap<u32, DrawnMarker>,
    adds: u32,
    moves: u32,
    removes: u32,
}

#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    log: Arc<Mutex<SurfaceLog>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Markers currently on screen, in creation order
    pub fn live(&self) -> Vec<DrawnMarker> {
        self.log.lock().live.values().copied().collect()
    }

    pub fn adds(&self) -> u32 {
        self.log.lock().adds
    }

    pub fn moves(&self) -> u32 {
        self.log.lock().moves
    }

    pub fn removes(&self) -> u32 {
        self.log.lock().removes
    }
}

impl MarkerSurface for MemorySurface {
    type Marker = u32;

    fn add_marker(&mut self, center: ViewPoint, diameter: f32) -> u32 {
        let mut log = self.log.lock();
        log.next_id += 1;
        log.adds += 1;
        let id = log.next_id;
        log.live.insert(id, DrawnMarker { center, diameter });
        id
    }

    fn move_marker(&mut self, marker: &mut u32, center: ViewPoint, diameter: f32) {
        let mut log = self.log.lock();
        log.moves += 1;
        log.live.insert(*marker, DrawnMarker { center, diameter });
    }

    fn remove_marker(&mut self, marker: u32) {
        let mut log = self.log.lock();
        log.removes += 1;
        log.live.remove(&marker);
    }
}
