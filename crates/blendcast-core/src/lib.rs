//! Blendcast Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every stage of the
//! sampling pipeline:
//! - Error taxonomy (BlendcastError)
//! - Identifiers (SessionId, ChannelId)
//! - Sample timestamps (SampleTime)
//! - Raw camera frames (RawFrame)

pub mod error;
pub mod frame;
pub mod id;
pub mod time;

pub use error::*;
pub use frame::*;
pub use id::*;
pub use time::*;
