//! In-memory blob store

use std::collections::BTreeMap;

use image::RgbImage;
use parking_lot::Mutex;

use blendcast_core::{BlendcastError, BlendcastResult};
use blendcast_store::{ArtifactNames, BlobStore};

/// A stored artifact
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    Text(String),
    /// Dimensions and quality of the image that would have been encoded
    Image { width: u32, height: u32, quality: u8 },
}

/// Which writes a `MemoryBlobStore` rejects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreFaults {
    pub reset: bool,
    pub text: bool,
    pub image: bool,
}

/// Blob store keeping artifacts in a map
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    artifacts: Mutex<BTreeMap<String, Artifact>>,
    resets: Mutex<u32>,
    faults: StoreFaults,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: StoreFaults) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }

    /// Pretend a previous session left artifacts behind
    pub fn seed(&self, name: &str, artifact: Artifact) {
        self.artifacts.lock().insert(name.to_string(), artifact);
    }

    pub fn names(&self) -> Vec<String> {
        self.artifacts.lock().keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<Artifact> {
        self.artifacts.lock().get(name).cloned()
    }

    pub fn texts(&self) -> Vec<(String, String)> {
        self.artifacts
            .lock()
            .iter()
            .filter_map(|(name, artifact)| match artifact {
                Artifact::Text(text) => Some((name.clone(), text.clone())),
                Artifact::Image { .. } => None,
            })
            .collect()
    }

    pub fn image_names(&self) -> Vec<String> {
        self.artifacts
            .lock()
            .iter()
            .filter(|(_, artifact)| matches!(artifact, Artifact::Image { .. }))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Timestamp stems that have both a text and an image artifact
    pub fn complete_pairs(&self) -> Vec<String> {
        let texts: Vec<String> = self
            .texts()
            .iter()
            .filter_map(|(name, _)| ArtifactNames::stem_of(name).map(str::to_string))
            .collect();
        self.image_names()
            .iter()
            .filter_map(|name| ArtifactNames::stem_of(name).map(str::to_string))
            .filter(|stem| texts.contains(stem))
            .collect()
    }

    pub fn resets(&self) -> u32 {
        *self.resets.lock()
    }
}

fn fault(what: &str) -> BlendcastError {
    BlendcastError::Io(std::io::Error::other(format!("injected {} fault", what)))
}

impl BlobStore for MemoryBlobStore {
    fn reset_session_dir(&self) -> BlendcastResult<()> {
        *self.resets.lock() += 1;
        if self.faults.reset {
            return Err(fault("reset"));
        }
        self.artifacts.lock().clear();
        Ok(())
    }

    fn write_text(&self, name: &str, content: &str) -> BlendcastResult<()> {
        if self.faults.text {
            return Err(fault("text"));
        }
        self.artifacts
            .lock()
            .insert(name.to_string(), Artifact::Text(content.to_string()));
        Ok(())
    }

    fn write_image(&self, name: &str, image: &RgbImage, quality: u8) -> BlendcastResult<()> {
        if self.faults.image {
            return Err(fault("image"));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(BlendcastError::EmptyFrame);
        }
        self.artifacts.lock().insert(
            name.to_string(),
            Artifact::Image {
                width: image.width(),
                height: image.height(),
                quality,
            },
        );
        Ok(())
    }
}
