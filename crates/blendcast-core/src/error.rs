//! Error types for the Blendcast pipeline

use std::time::Duration;

use thiserror::Error;

/// Core Blendcast errors
#[derive(Error, Debug)]
pub enum BlendcastError {
    // Tracking errors
    #[error("Missing expression coefficient: {0}")]
    MissingCoefficient(&'static str),

    #[error("Unknown blendshape: {0}")]
    UnknownBlendShape(String),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Detector failed: {0}")]
    DetectorFailed(String),

    // Record errors
    #[error("Field count mismatch: expected {expected}, got {actual}")]
    FieldCountMismatch { expected: usize, actual: usize },

    #[error("Unparsable field {index}: {value:?}")]
    UnparsableField { index: usize, value: String },

    #[error("Unknown record layout: {0}")]
    UnknownLayout(u8),

    // Envelope errors
    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("Bad envelope magic")]
    BadMagic,

    #[error("Unsupported envelope version: {0}")]
    UnsupportedVersion(u8),

    #[error("Invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    #[error("Channel name too long: {0} bytes")]
    ChannelTooLong(usize),

    // Transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Publish timed out after {0:?}")]
    PublishTimeout(Duration),

    // Storage errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encode failed: {0}")]
    ImageEncode(String),

    #[error("Empty frame")]
    EmptyFrame,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    // Session errors
    #[error("Session not running")]
    SessionNotRunning,

    #[error("Scheduler failed: {0}")]
    SchedulerFailed(String),
}

impl From<image::ImageError> for BlendcastError {
    fn from(err: image::ImageError) -> Self {
        BlendcastError::ImageEncode(err.to_string())
    }
}

/// Result type for Blendcast operations
pub type BlendcastResult<T> = Result<T, BlendcastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let timeout = BlendcastError::PublishTimeout(Duration::from_millis(250));
        assert_eq!(timeout.to_string(), "Publish timed out after 250ms");

        let failed = BlendcastError::SchedulerFailed("task 7 panicked".into());
        assert_eq!(failed.to_string(), "Scheduler failed: task 7 panicked");
    }
}
