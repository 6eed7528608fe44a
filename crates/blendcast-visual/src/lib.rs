//! Blendcast Visual State
//!
//! Everything the sampling tick derives from a tracked performer:
//!
//! - Facial expression coefficients (52 ARKit blendshapes)
//! - Head orientation (yaw, pitch, roll in degrees)
//! - Body-point markers for the on-screen overlay
//!
//! Detectors and renderers live outside this crate. They are reached
//! through the `FaceDetector`, `BodyPointDetector` and `MarkerSurface`
//! traits.

pub mod face;
pub mod orientation;
pub mod pose;

pub use face::*;
pub use orientation::*;
pub use pose::*;
