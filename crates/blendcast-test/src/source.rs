//! Tracking sources for tests and demos
//!
//! - `ScriptedSource`: returns whatever a test last put through its
//!   `ScriptHandle`, so a scenario can change the performer while a
//!   session is running
//! - `SyntheticSource`: seeded, smoothly moving performer with
//!   occasional tracking gaps

use std::f32::consts::PI;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use blendcast_core::RawFrame;
use blendcast_runtime::TrackingSource;
use blendcast_visual::{BlendShape, ExpressionFrame, HeadTransform};

// ============================================================================
// SCRIPTED SOURCE
// ============================================================================

#[derive(Debug, Clone, Default)]
struct Script {
    expression: Option<ExpressionFrame>,
    transform: Option<HeadTransform>,
    frame: Option<RawFrame>,
    snapshot: Option<RawFrame>,
    reads: u64,
}

/// Source that replays the values set through its handle
pub struct ScriptedSource {
    script: Arc<Mutex<Script>>,
}

/// Test-side control of a `ScriptedSource`
#[derive(Clone)]
pub struct ScriptHandle {
    script: Arc<Mutex<Script>>,
}

impl ScriptedSource {
    /// Empty source: every accessor returns `None` until set
    pub fn new() -> (Self, ScriptHandle) {
        let script = Arc::new(Mutex::new(Script::default()));
        (
            ScriptedSource {
                script: Arc::clone(&script),
            },
            ScriptHandle { script },
        )
    }

    /// Source already holding a neutral face, identity pose and a frame
    pub fn neutral(width: u32, height: u32) -> (Self, ScriptHandle) {
        let (source, handle) = Self::new();
        handle.set_expression(Some(ExpressionFrame::neutral()));
        handle.set_transform(Some(HeadTransform::IDENTITY));
        handle.set_frame(Some(RawFrame::filled(width, height, [128, 128, 128])));
        (source, handle)
    }
}

impl ScriptHandle {
    pub fn set_expression(&self, expression: Option<ExpressionFrame>) {
        self.script.lock().expression = expression;
    }

    pub fn set_transform(&self, transform: Option<HeadTransform>) {
        self.script.lock().transform = transform;
    }

    pub fn set_frame(&self, frame: Option<RawFrame>) {
        self.script.lock().frame = frame;
    }

    /// Override what the overlay sees (defaults to the raw frame)
    pub fn set_snapshot(&self, snapshot: Option<RawFrame>) {
        self.script.lock().snapshot = snapshot;
    }

    /// Number of expression reads so far (one per sampling tick)
    pub fn reads(&self) -> u64 {
        self.script.lock().reads
    }
}

impl TrackingSource for ScriptedSource {
    fn current_expression_frame(&mut self) -> Option<ExpressionFrame> {
        let mut script = self.script.lock();
        script.reads += 1;
        script.expression.clone()
    }

    fn current_head_transform(&mut self) -> Option<HeadTransform> {
        self.script.lock().transform
    }

    fn current_raw_frame(&mut self) -> Option<RawFrame> {
        self.script.lock().frame.clone()
    }

    fn rendered_snapshot(&mut self) -> Option<RawFrame> {
        let script = self.script.lock();
        script.snapshot.clone().or_else(|| script.frame.clone())
    }
}

// ============================================================================
// SYNTHETIC SOURCE
// ============================================================================

/// Synthetic performer configuration
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Probability a tick has no tracked face
    pub gap_probability: f64,
    /// Peak head yaw in degrees
    pub head_swing_deg: f32,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            gap_probability: 0.05,
            head_swing_deg: 25.0,
            frame_width: 1920,
            frame_height: 1440,
        }
    }
}

/// Seeded performer: every coefficient follows its own slow sine with a
/// little jitter; the head swings about the vertical axis
pub struct SyntheticSource {
    config: SyntheticConfig,
    rng: StdRng,
    phases: [f32; BlendShape::COUNT],
    speeds: [f32; BlendShape::COUNT],
    tick: u64,
    tracked: bool,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut phases = [0.0; BlendShape::COUNT];
        let mut speeds = [0.0; BlendShape::COUNT];
        for i in 0..BlendShape::COUNT {
            phases[i] = rng.gen_range(0.0..2.0 * PI);
            speeds[i] = rng.gen_range(0.02..0.2);
        }

        Self {
            config,
            rng,
            phases,
            speeds,
            tick: 0,
            tracked: false,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(SyntheticConfig::default(), seed)
    }

    /// Head pose at the current tick
    pub fn head_yaw_deg(&self) -> f32 {
        self.config.head_swing_deg * (self.tick as f32 * 0.05).sin()
    }

    fn expression(&mut self) -> ExpressionFrame {
        let t = self.tick as f32;
        let mut frame = ExpressionFrame::neutral();
        for shape in BlendShape::ALL {
            let i = shape.index();
            let wave = 0.5 + 0.5 * (t * self.speeds[i] + self.phases[i]).sin();
            let jitter: f32 = self.rng.gen_range(-0.01..0.01);
            frame.set(shape, (wave + jitter).clamp(0.0, 1.0));
        }
        frame
    }
}

/// Rotation about the vertical axis, column major
pub fn rotation_about_y(degrees: f32) -> HeadTransform {
    let (sin, cos) = degrees.to_radians().sin_cos();
    HeadTransform::from_columns([
        [cos, 0.0, -sin, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [sin, 0.0, cos, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

impl TrackingSource for SyntheticSource {
    fn current_expression_frame(&mut self) -> Option<ExpressionFrame> {
        self.tick += 1;
        self.tracked = !self.rng.gen_bool(self.config.gap_probability.clamp(0.0, 1.0));
        if self.tracked {
            Some(self.expression())
        } else {
            None
        }
    }

    fn current_head_transform(&mut self) -> Option<HeadTransform> {
        self.tracked.then(|| rotation_about_y(self.head_yaw_deg()))
    }

    fn current_raw_frame(&mut self) -> Option<RawFrame> {
        let shade = (self.tick % 200) as u8;
        Some(RawFrame::filled(
            self.config.frame_width,
            self.config.frame_height,
            [shade, 64, 255 - shade],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_source_follows_handle() {
        let (mut source, handle) = ScriptedSource::new();
        assert!(source.current_expression_frame().is_none());

        handle.set_expression(Some(ExpressionFrame::uniform(0.25)));
        let frame = source.current_expression_frame().unwrap();
        assert_eq!(frame.get(BlendShape::JawOpen), 0.25);
        assert_eq!(handle.reads(), 2);
    }

    #[test]
    fn test_snapshot_defaults_to_frame() {
        let (mut source, handle) = ScriptedSource::neutral(8, 8);
        let frame = source.current_raw_frame().unwrap();
        assert!(source.rendered_snapshot().unwrap().same_capture(&frame));

        handle.set_snapshot(Some(RawFrame::filled(2, 2, [0, 0, 0])));
        assert_eq!(source.rendered_snapshot().unwrap().width(), 2);
    }

    #[test]
    fn test_synthetic_is_deterministic() {
        let mut a = SyntheticSource::with_seed(7);
        let mut b = SyntheticSource::with_seed(7);
        for _ in 0..50 {
            assert_eq!(a.current_expression_frame(), b.current_expression_frame());
        }
    }

    #[test]
    fn test_synthetic_values_in_range() {
        let mut source = SyntheticSource::new(
            SyntheticConfig {
                gap_probability: 0.0,
                ..SyntheticConfig::default()
            },
            1,
        );
        for _ in 0..20 {
            let frame = source.current_expression_frame().unwrap();
            assert!(frame.iter().all(|(_, v)| (0.0..=1.0).contains(&v)));
            assert!(source.current_head_transform().is_some());
        }
    }

    #[test]
    fn test_synthetic_gaps() {
        let mut source = SyntheticSource::new(
            SyntheticConfig {
                gap_probability: 1.0,
                ..SyntheticConfig::default()
            },
            3,
        );
        assert!(source.current_expression_frame().is_none());
        assert!(source.current_head_transform().is_none());
        assert!(source.current_raw_frame().is_some());
    }
}
