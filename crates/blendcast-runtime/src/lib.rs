//! Blendcast Runtime - Session orchestration
//!
//! A session runs three fixed-cadence ticks over one shared state:
//!
//! 1. Sampling (0.1 s): read the tracker, update the body-point
//!    overlay, estimate head orientation, encode and commit a record
//! 2. Message (0.33 s): publish the current record if it changed
//! 3. File save (1.0 s): persist the record and a downscaled frame
//!
//! All three run on one scheduler task; publishes and artifact writes
//! are handed to background jobs the scheduler waits for on stop.

pub mod config;
pub mod dispatch;
pub mod persist;
pub mod sampler;
pub mod session;
pub mod source;
pub mod state;
pub mod stats;
pub mod telemetry;

pub use config::*;
pub use dispatch::*;
pub use persist::*;
pub use sampler::*;
pub use session::*;
pub use source::*;
pub use state::*;
pub use stats::*;
pub use telemetry::{init_logging, LogFormat};
