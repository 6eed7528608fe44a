//! Head orientation estimation
//!
//! Two interchangeable strategies produce yaw/pitch/roll in degrees:
//!
//! - Geometric: decompose the tracker's 4x4 head transform through a
//!   quaternion into Euler angles.
//! - Image-based: ask a face-rectangle detector for the angles of the
//!   first face in the raw camera frame.
//!
//! Neither strategy ever fails a tick. Degenerate input yields the
//! zero orientation, missing input or detector failure reuses the
//! previous estimate.

use blendcast_core::{BlendcastResult, RawFrame};
use serde::{Deserialize, Serialize};

/// Head orientation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Orientation {
    pub const ZERO: Orientation = Orientation {
        yaw: 0.0,
        pitch: 0.0,
        roll: 0.0,
    };

    pub fn new(yaw: f32, pitch: f32, roll: f32) -> Self {
        Self { yaw, pitch, roll }
    }

    pub fn is_finite(&self) -> bool {
        self.yaw.is_finite() && self.pitch.is_finite() && self.roll.is_finite()
    }
}

/// Column-major 4x4 head transform, as reported by the tracker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadTransform {
    pub columns: [[f32; 4]; 4],
}

impl HeadTransform {
    pub const IDENTITY: HeadTransform = HeadTransform {
        columns: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn from_columns(columns: [[f32; 4]; 4]) -> Self {
        Self { columns }
    }

    /// Element at (`column`, `row`)
    #[inline]
    pub fn at(&self, column: usize, row: usize) -> f32 {
        self.columns[column][row]
    }

    /// Translation part of the transform
    pub fn translation(&self) -> [f32; 3] {
        [self.columns[3][0], self.columns[3][1], self.columns[3][2]]
    }

    /// Unit quaternion of the rotation part, or `None` when the trace
    /// leaves no usable `w` term (rotations near 180 degrees, garbage input)
    pub fn quaternion(&self) -> Option<Quaternion> {
        let radicand = 1.0 + self.at(0, 0) + self.at(1, 1) + self.at(2, 2);
        if !radicand.is_finite() || radicand <= 0.0 {
            return None;
        }

        let w = radicand.sqrt() / 2.0;
        let denom = w * 4.0;
        if denom < MIN_QUATERNION_DENOM {
            return None;
        }

        Quaternion {
            w,
            x: (self.at(2, 1) - self.at(1, 2)) / denom,
            y: (self.at(0, 2) - self.at(2, 0)) / denom,
            z: (self.at(1, 0) - self.at(0, 1)) / denom,
        }
        .normalized()
    }
}

impl Default for HeadTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Smallest accepted `4w` denominator when extracting a quaternion
const MIN_QUATERNION_DENOM: f32 = 1e-6;

/// Rotation quaternion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    pub fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.w.is_finite() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Unit-length copy, `None` if the norm is zero or not finite
    pub fn normalized(&self) -> Option<Quaternion> {
        let norm = (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if !norm.is_finite() || norm < f32::EPSILON {
            return None;
        }
        Some(Quaternion {
            w: self.w / norm,
            x: self.x / norm,
            y: self.y / norm,
            z: self.z / norm,
        })
    }

    /// Yaw (z), pitch (y) and roll (x) in degrees.
    ///
    /// Pitch saturates at +/-90 degrees when rounding pushes
    /// `|sin(pitch)|` to 1 or past it.
    pub fn to_euler_degrees(&self) -> Orientation {
        let Quaternion { w, x, y, z } = *self;

        let siny = 2.0 * (w * z + x * y);
        let cosy = 1.0 - 2.0 * (y * y + z * z);
        let yaw = siny.atan2(cosy);

        let sinp = 2.0 * (w * y - z * x);
        let pitch = if sinp.abs() >= 1.0 {
            std::f32::consts::FRAC_PI_2.copysign(sinp)
        } else {
            sinp.asin()
        };

        let sinr = 2.0 * (w * x + y * z);
        let cosr = 1.0 - 2.0 * (x * x + y * y);
        let roll = sinr.atan2(cosr);

        Orientation {
            yaw: yaw.to_degrees(),
            pitch: pitch.to_degrees(),
            roll: roll.to_degrees(),
        }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

/// What one sampling tick hands to an estimator
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatorInput<'a> {
    pub head_transform: Option<&'a HeadTransform>,
    pub frame: Option<&'a RawFrame>,
}

/// Produces one orientation per sampling tick
pub trait OrientationEstimator: Send {
    fn estimate(&mut self, input: &EstimatorInput<'_>) -> Orientation;
}

/// Estimator selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrientationStrategy {
    #[default]
    Geometric,
    ImageBased,
}

/// Orientation from the tracker's head transform
#[derive(Debug, Clone, Default)]
pub struct GeometricEstimator {
    last: Orientation,
}

impl GeometricEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stateless conversion; degenerate transforms map to zero
    pub fn from_transform(transform: &HeadTransform) -> Orientation {
        match transform.quaternion() {
            Some(q) => q.to_euler_degrees(),
            None => {
                tracing::debug!("degenerate head transform, using zero orientation");
                Orientation::ZERO
            }
        }
    }
}

impl OrientationEstimator for GeometricEstimator {
    fn estimate(&mut self, input: &EstimatorInput<'_>) -> Orientation {
        if let Some(transform) = input.head_transform {
            self.last = Self::from_transform(transform);
        }
        self.last
    }
}

/// One face found by a face-rectangle detector. Angles are in degrees
/// and absent when the detector revision does not report them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FaceObservation {
    pub yaw: Option<f32>,
    pub pitch: Option<f32>,
    pub roll: Option<f32>,
}

/// External face-rectangle detector
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &RawFrame) -> BlendcastResult<Vec<FaceObservation>>;
}

/// Detector that never finds a face. Used when the geometric strategy
/// is selected and no real detector is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFaceDetector;

impl FaceDetector for NoFaceDetector {
    fn detect(&mut self, _frame: &RawFrame) -> BlendcastResult<Vec<FaceObservation>> {
        Ok(Vec::new())
    }
}

/// Orientation from a face-rectangle detector run on the raw frame
pub struct ImageEstimator<D> {
    detector: D,
    last: Orientation,
}

impl<D: FaceDetector> ImageEstimator<D> {
    pub fn new(detector: D) -> Self {
        Self {
            detector,
            last: Orientation::ZERO,
        }
    }

    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }
}

impl<D: FaceDetector> OrientationEstimator for ImageEstimator<D> {
    fn estimate(&mut self, input: &EstimatorInput<'_>) -> Orientation {
        let Some(frame) = input.frame else {
            return self.last;
        };

        match self.detector.detect(frame) {
            Ok(faces) => {
                self.last = faces
                    .first()
                    .map(|face| Orientation {
                        yaw: face.yaw.unwrap_or(0.0),
                        pitch: face.pitch.unwrap_or(0.0),
                        roll: face.roll.unwrap_or(0.0),
                    })
                    .unwrap_or(Orientation::ZERO);
            }
            Err(e) => {
                tracing::warn!("face detector failed: {}", e);
            }
        }

        self.last
    }
}

/// Either strategy, chosen at session start
pub enum AnyEstimator<D> {
    Geometric(GeometricEstimator),
    ImageBased(ImageEstimator<D>),
}

impl<D: FaceDetector> AnyEstimator<D> {
    pub fn for_strategy(strategy: OrientationStrategy, detector: D) -> Self {
        match strategy {
            OrientationStrategy::Geometric => AnyEstimator::Geometric(GeometricEstimator::new()),
            OrientationStrategy::ImageBased => AnyEstimator::ImageBased(ImageEstimator::new(detector)),
        }
    }

    pub fn strategy(&self) -> OrientationStrategy {
        match self {
            AnyEstimator::Geometric(_) => OrientationStrategy::Geometric,
            AnyEstimator::ImageBased(_) => OrientationStrategy::ImageBased,
        }
    }
}

impl<D: FaceDetector> OrientationEstimator for AnyEstimator<D> {
    fn estimate(&mut self, input: &EstimatorInput<'_>) -> Orientation {
        match self {
            AnyEstimator::Geometric(estimator) => estimator.estimate(input),
            AnyEstimator::ImageBased(estimator) => estimator.estimate(input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blendcast_core::BlendcastError;
    use proptest::prelude::*;

    const EPS: f32 = 1e-3;

    /// Rotation of `degrees` about the y axis, uniformly scaled
    fn scaled_y_rotation(degrees: f32, scale: f32) -> HeadTransform {
        let (s, c) = degrees.to_radians().sin_cos();
        HeadTransform::from_columns([
            [scale * c, 0.0, -scale * s, 0.0],
            [0.0, scale, 0.0, 0.0],
            [scale * s, 0.0, scale * c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    fn z_rotation(degrees: f32) -> HeadTransform {
        let (s, c) = degrees.to_radians().sin_cos();
        HeadTransform::from_columns([
            [c, s, 0.0, 0.0],
            [-s, c, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    struct ScriptedDetector {
        replies: Vec<BlendcastResult<Vec<FaceObservation>>>,
    }

    impl FaceDetector for ScriptedDetector {
        fn detect(&mut self, _frame: &RawFrame) -> BlendcastResult<Vec<FaceObservation>> {
            if self.replies.is_empty() {
                Ok(Vec::new())
            } else {
                self.replies.remove(0)
            }
        }
    }

    #[test]
    fn test_identity_is_zero() {
        let o = GeometricEstimator::from_transform(&HeadTransform::IDENTITY);
        assert!(o.yaw.abs() < EPS);
        assert!(o.pitch.abs() < EPS);
        assert!(o.roll.abs() < EPS);
    }

    #[test]
    fn test_z_rotation_is_yaw() {
        let o = GeometricEstimator::from_transform(&z_rotation(30.0));
        assert!((o.yaw.abs() - 30.0).abs() < EPS, "{:?}", o);
        assert!(o.pitch.abs() < EPS);
        assert!(o.roll.abs() < EPS);
    }

    #[test]
    fn test_quarter_turn_pitch_saturates() {
        let o = GeometricEstimator::from_transform(&scaled_y_rotation(90.0, 1.0));
        assert!((o.pitch.abs() - 90.0).abs() < 0.05, "{:?}", o);
        assert!(o.is_finite());
    }

    #[test]
    fn test_out_of_range_sinp_clamps_pitch() {
        // Not unit length: sinp = 2
        let o = Quaternion { w: 1.0, x: 0.0, y: 1.0, z: 0.0 }.to_euler_degrees();
        assert!((o.pitch - 90.0).abs() < 1e-4, "{:?}", o);

        let o = Quaternion { w: 1.0, x: 0.0, y: -1.0, z: 0.0 }.to_euler_degrees();
        assert!((o.pitch + 90.0).abs() < 1e-4, "{:?}", o);
    }

    #[test]
    fn test_uniform_scale_does_not_change_pitch() {
        let unit = GeometricEstimator::from_transform(&scaled_y_rotation(40.0, 1.0));
        let scaled = GeometricEstimator::from_transform(&scaled_y_rotation(40.0, 2.0));
        assert!((unit.pitch.abs() - 40.0).abs() < EPS, "{:?}", unit);
        assert!(scaled.is_finite());
        assert!(scaled.pitch.abs() < 90.0);
    }

    #[test]
    fn test_half_turn_falls_back_to_zero() {
        // trace = -1, so w = 0
        let o = GeometricEstimator::from_transform(&z_rotation(180.0));
        assert_eq!(o, Orientation::ZERO);
    }

    #[test]
    fn test_nan_transform_falls_back_to_zero() {
        let mut t = HeadTransform::IDENTITY;
        t.columns[0][0] = f32::NAN;
        assert_eq!(GeometricEstimator::from_transform(&t), Orientation::ZERO);
    }

    #[test]
    fn test_geometric_reuses_last_without_transform() {
        let mut estimator = GeometricEstimator::new();
        let t = z_rotation(20.0);
        let first = estimator.estimate(&EstimatorInput {
            head_transform: Some(&t),
            frame: None,
        });
        let second = estimator.estimate(&EstimatorInput::default());
        assert_eq!(first, second);
    }

    #[test]
    fn test_image_first_face_wins() {
        let detector = ScriptedDetector {
            replies: vec![Ok(vec![
                FaceObservation {
                    yaw: Some(12.0),
                    pitch: None,
                    roll: Some(-3.0),
                },
                FaceObservation {
                    yaw: Some(99.0),
                    pitch: Some(99.0),
                    roll: Some(99.0),
                },
            ])],
        };
        let mut estimator = ImageEstimator::new(detector);
        let frame = RawFrame::filled(4, 4, [0, 0, 0]);

        let o = estimator.estimate(&EstimatorInput {
            head_transform: None,
            frame: Some(&frame),
        });
        assert_eq!(o, Orientation::new(12.0, 0.0, -3.0));
    }

    #[test]
    fn test_image_detector_error_keeps_previous() {
        let detector = ScriptedDetector {
            replies: vec![
                Ok(vec![FaceObservation {
                    yaw: Some(5.0),
                    pitch: Some(6.0),
                    roll: Some(7.0),
                }]),
                Err(BlendcastError::DetectorFailed("busy".into())),
                Ok(Vec::new()),
            ],
        };
        let mut estimator = ImageEstimator::new(detector);
        let frame = RawFrame::filled(4, 4, [0, 0, 0]);
        let input = EstimatorInput {
            head_transform: None,
            frame: Some(&frame),
        };

        assert_eq!(estimator.estimate(&input), Orientation::new(5.0, 6.0, 7.0));
        assert_eq!(estimator.estimate(&input), Orientation::new(5.0, 6.0, 7.0));
        // No face this tick
        assert_eq!(estimator.estimate(&input), Orientation::ZERO);
    }

    #[test]
    fn test_any_estimator_dispatch() {
        let estimator = AnyEstimator::for_strategy(OrientationStrategy::ImageBased, NoFaceDetector);
        assert_eq!(estimator.strategy(), OrientationStrategy::ImageBased);

        let mut estimator = AnyEstimator::for_strategy(OrientationStrategy::Geometric, NoFaceDetector);
        let t = HeadTransform::IDENTITY;
        let o = estimator.estimate(&EstimatorInput {
            head_transform: Some(&t),
            frame: None,
        });
        assert!(o.yaw.abs() < EPS);
    }

    proptest! {
        #[test]
        fn prop_geometric_output_is_finite(columns in prop::array::uniform4(prop::array::uniform4(-10.0f32..10.0))) {
            let o = GeometricEstimator::from_transform(&HeadTransform::from_columns(columns));
            prop_assert!(o.is_finite());
            prop_assert!(o.pitch.abs() <= 90.0 + EPS);
        }
    }
}
