//! Blendcast Wire Format
//!
//! This crate implements what goes over the messaging channel and
//! into the persisted `.csv` artifacts:
//! - Record: one comma separated text line per sampling tick,
//!   laid out by a versioned, ordered field list
//! - Envelope: binary datagram framing (magic, version, channel,
//!   sequence) around a record body

pub mod envelope;
pub mod record;

pub use envelope::*;
pub use record::*;
