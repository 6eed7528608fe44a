//! Blendcast Transport Layer
//!
//! This crate provides:
//! - The `Transport` seam the dispatcher publishes through
//! - UDP fan-out to per-channel subscriber lists
//! - In-process broadcast for embedding and tests

pub mod local;
pub mod transport;
pub mod udp;

pub use local::*;
pub use transport::*;
pub use udp::*;
