//! Blendcast Artifact Storage
//!
//! Each file-save tick produces a pair of artifacts named by the same
//! sample time: the record text (`bs-<t>.csv`) and a downscaled JPEG
//! of the frame it was sampled from (`pic-<t>.jpg`). Both land in one
//! session directory that is emptied when a session starts.

pub mod blob;
pub mod fs;

pub use blob::*;
pub use fs::*;
