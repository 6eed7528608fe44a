//! Blendcast Test Harness
//!
//! This crate provides:
//! - Scripted and seeded synthetic tracking sources
//! - Recording and failing transports
//! - In-memory blob store with fault injection
//! - Overlay fakes (fixed body detector, recording marker surface)
//! - End-to-end session scenarios

pub mod integration;
pub mod overlay;
pub mod source;
pub mod store;
pub mod transport;

pub use integration::*;
pub use overlay::*;
pub use source::*;
pub use store::*;
pub use transport::*;
