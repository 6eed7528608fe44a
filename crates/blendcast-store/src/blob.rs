//! Blob store seam and artifact naming

use std::sync::Arc;

use image::RgbImage;

use blendcast_core::{BlendcastResult, SampleTime};

/// Record text artifact prefix
pub const TEXT_PREFIX: &str = "bs-";
/// Record text artifact extension
pub const TEXT_EXTENSION: &str = "csv";
/// Snapshot artifact prefix
pub const IMAGE_PREFIX: &str = "pic-";
/// Snapshot artifact extension
pub const IMAGE_EXTENSION: &str = "jpg";

/// Where session artifacts are written.
///
/// Calls are blocking; the persistence sink runs them on a blocking
/// worker, never on the scheduler task.
pub trait BlobStore: Send + Sync + 'static {
    /// Delete the session directory if present and recreate it empty
    fn reset_session_dir(&self) -> BlendcastResult<()>;

    /// Write a text artifact, replacing any previous one with that name
    fn write_text(&self, name: &str, content: &str) -> BlendcastResult<()>;

    /// JPEG-encode `image` at `quality` (1..=100) and store it
    fn write_image(&self, name: &str, image: &RgbImage, quality: u8) -> BlendcastResult<()>;
}

impl<B: BlobStore> BlobStore for Arc<B> {
    fn reset_session_dir(&self) -> BlendcastResult<()> {
        (**self).reset_session_dir()
    }

    fn write_text(&self, name: &str, content: &str) -> BlendcastResult<()> {
        (**self).write_text(name, content)
    }

    fn write_image(&self, name: &str, image: &RgbImage, quality: u8) -> BlendcastResult<()> {
        (**self).write_image(name, image, quality)
    }
}

/// Names of the two artifacts of one file-save tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    pub text: String,
    pub image: String,
}

impl ArtifactNames {
    /// Both names share the same rendering of `time`
    pub fn for_time(time: SampleTime) -> Self {
        let stem = time.file_stem();
        Self {
            text: format!("{}{}.{}", TEXT_PREFIX, stem, TEXT_EXTENSION),
            image: format!("{}{}.{}", IMAGE_PREFIX, stem, IMAGE_EXTENSION),
        }
    }

    /// The shared timestamp part of an artifact name, if it is one
    pub fn stem_of(name: &str) -> Option<&str> {
        let (rest, ext) = name.rsplit_once('.')?;
        match ext {
            TEXT_EXTENSION => rest.strip_prefix(TEXT_PREFIX),
            IMAGE_EXTENSION => rest.strip_prefix(IMAGE_PREFIX),
            _ => None,
        }
    }
}
