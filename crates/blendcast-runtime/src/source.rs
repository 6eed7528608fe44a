//! Tracking source seam
//!
//! The face tracker, camera and view renderer are external. The
//! scheduler reads whatever they currently hold once per sampling
//! tick; every accessor may come back empty on any tick.

use blendcast_core::RawFrame;
use blendcast_visual::{ExpressionFrame, HeadTransform};

pub trait TrackingSource: Send + 'static {
    /// Current expression coefficients, if a face is tracked
    fn current_expression_frame(&mut self) -> Option<ExpressionFrame>;

    /// Current head pose, if a face is tracked
    fn current_head_transform(&mut self) -> Option<HeadTransform>;

    /// Latest camera image
    fn current_raw_frame(&mut self) -> Option<RawFrame>;

    /// What the view currently shows; the body-point detector runs on it
    fn rendered_snapshot(&mut self) -> Option<RawFrame> {
        self.current_raw_frame()
    }
}
