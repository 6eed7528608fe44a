//! Body-point overlay
//!
//! A body-pose detector runs on each sampled frame. For a small fixed
//! set of torso joints the overlay keeps one circular marker on the
//! view, created on first sighting and moved afterwards. The marker map
//! is keyed by joint, so a joint never gets two markers.

use std::collections::HashMap;

use blendcast_core::{BlendcastResult, RawFrame};

/// Joint identifier reported by the body-pose detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Joint {
    // Head
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,

    // Torso
    Neck,
    LeftShoulder,
    RightShoulder,
    Root,
    LeftHip,
    RightHip,

    // Arms
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,

    // Legs
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Joint {
    /// Joints that get an on-screen marker
    pub const TRACKED: [Joint; 3] = [Joint::Neck, Joint::LeftShoulder, Joint::RightShoulder];

    /// All joints in order
    pub fn all() -> &'static [Joint] {
        &[
            Joint::Nose,
            Joint::LeftEye,
            Joint::RightEye,
            Joint::LeftEar,
            Joint::RightEar,
            Joint::Neck,
            Joint::LeftShoulder,
            Joint::RightShoulder,
            Joint::Root,
            Joint::LeftHip,
            Joint::RightHip,
            Joint::LeftElbow,
            Joint::RightElbow,
            Joint::LeftWrist,
            Joint::RightWrist,
            Joint::LeftKnee,
            Joint::RightKnee,
            Joint::LeftAnkle,
            Joint::RightAnkle,
        ]
    }

    /// Number of joints
    pub fn count() -> usize {
        19
    }

    #[inline]
    pub fn is_tracked(self) -> bool {
        Self::TRACKED.contains(&self)
    }
}

/// Detector-space point: unit square, origin bottom-left
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NormalizedPoint {
    pub x: f32,
    pub y: f32,
}

impl NormalizedPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// View-space point in pixels, origin top-left
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewPoint {
    pub x: f32,
    pub y: f32,
}

/// Size of the view the markers are drawn on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSize {
    pub width: f32,
    pub height: f32,
}

impl ViewSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Map a detector-space point into this view (y axis flipped)
    pub fn project(&self, point: NormalizedPoint) -> ViewPoint {
        ViewPoint {
            x: self.width * point.x,
            y: self.height * (1.0 - point.y),
        }
    }
}

/// One detected body with its recognised joints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyObservation {
    pub points: Vec<(Joint, NormalizedPoint)>,
}

impl BodyObservation {
    pub fn point(&self, joint: Joint) -> Option<NormalizedPoint> {
        self.points
            .iter()
            .find(|(j, _)| *j == joint)
            .map(|(_, p)| *p)
    }
}

/// External body-pose detector
pub trait BodyPointDetector: Send {
    fn detect(&mut self, frame: &RawFrame) -> BlendcastResult<Vec<BodyObservation>>;
}

/// Detector that never sees a body
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBodyDetector;

impl BodyPointDetector for NoBodyDetector {
    fn detect(&mut self, _frame: &RawFrame) -> BlendcastResult<Vec<BodyObservation>> {
        Ok(Vec::new())
    }
}

/// Whatever draws the markers (a view layer, a test recorder, ...)
pub trait MarkerSurface: Send {
    type Marker: Send;

    fn add_marker(&mut self, center: ViewPoint, diameter: f32) -> Self::Marker;
    fn move_marker(&mut self, marker: &mut Self::Marker, center: ViewPoint, diameter: f32);
    fn remove_marker(&mut self, marker: Self::Marker);
}

/// Surface that draws nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSurface;

impl MarkerSurface for NullSurface {
    type Marker = ();

    fn add_marker(&mut self, _center: ViewPoint, _diameter: f32) {}
    fn move_marker(&mut self, _marker: &mut (), _center: ViewPoint, _diameter: f32) {}
    fn remove_marker(&mut self, _marker: ()) {}
}

/// Keyed marker set for the tracked joints
pub struct BodyPointOverlay<S: MarkerSurface> {
    surface: S,
    view: ViewSize,
    diameter: f32,
    markers: HashMap<Joint, S::Marker>,
}

impl<S: MarkerSurface> BodyPointOverlay<S> {
    pub fn new(surface: S, view: ViewSize, diameter: f32) -> Self {
        Self {
            surface,
            view,
            diameter,
            markers: HashMap::new(),
        }
    }

    /// Run the detector on `frame` and apply what it found.
    /// Detector errors leave the markers untouched.
    pub fn process_frame<D: BodyPointDetector>(&mut self, detector: &mut D, frame: &RawFrame) {
        match detector.detect(frame) {
            Ok(observations) => {
                self.update(&observations);
            }
            Err(e) => {
                tracing::warn!("body pose detection failed: {}", e);
            }
        }
    }

    /// Upsert markers for every tracked joint in `observations`.
    /// Returns the number of markers placed or moved.
    pub fn update(&mut self, observations: &[BodyObservation]) -> usize {
        let mut touched = 0;
        for observation in observations {
            for joint in Joint::TRACKED {
                if let Some(point) = observation.point(joint) {
                    self.upsert(joint, self.view.project(point));
                    touched += 1;
                }
            }
        }
        touched
    }

    fn upsert(&mut self, joint: Joint, center: ViewPoint) {
        match self.markers.get_mut(&joint) {
            Some(marker) => self.surface.move_marker(marker, center, self.diameter),
            None => {
                let marker = self.surface.add_marker(center, self.diameter);
                self.markers.insert(joint, marker);
            }
        }
    }

    /// Remove every marker from the surface and forget them
    pub fn clear(&mut self) {
        for (_, marker) in self.markers.drain() {
            self.surface.remove_marker(marker);
        }
    }

    pub fn marker(&self, joint: Joint) -> Option<&S::Marker> {
        self.markers.get(&joint)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn view(&self) -> ViewSize {
        self.view
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}
