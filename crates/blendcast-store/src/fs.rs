//! Filesystem blob store
//!
//! Artifacts are written to `<root>/<session_dir>/<name>` through a
//! temporary sibling file and a rename, so a reader never observes a
//! half-written artifact.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, RgbImage};

use blendcast_core::{BlendcastError, BlendcastResult};

use crate::BlobStore;

const TEMP_SUFFIX: &str = ".part";

/// Blob store rooted in a local directory
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    session_dir: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, session_dir: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            session_dir: session_dir.into(),
        }
    }

    /// Full path of the session directory
    pub fn session_path(&self) -> PathBuf {
        self.root.join(&self.session_dir)
    }

    /// Full path an artifact is stored at
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.session_path().join(name)
    }

    /// Names of the artifacts currently in the session directory, sorted
    pub fn list(&self) -> BlendcastResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.session_path())? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if !name.ends_with(TEMP_SUFFIX) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> BlendcastResult<()> {
        let target = self.artifact_path(name);
        let temp = temp_path(&target);

        let result = (|| {
            let mut file = fs::File::create(&temp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            fs::rename(&temp, &target)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Encode an RGB image as baseline JPEG
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> BlendcastResult<Vec<u8>> {
    if image.width() == 0 || image.height() == 0 {
        return Err(BlendcastError::EmptyFrame);
    }

    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
    encoder.encode(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)?;
    Ok(bytes)
}

impl BlobStore for FsBlobStore {
    fn reset_session_dir(&self) -> BlendcastResult<()> {
        let path = self.session_path();
        if path.exists() {
            fs::remove_dir_all(&path)?;
            tracing::debug!("removed previous session directory {}", path.display());
        }
        fs::create_dir_all(&path)?;
        Ok(())
    }

    fn write_text(&self, name: &str, content: &str) -> BlendcastResult<()> {
        self.write_atomic(name, content.as_bytes())
    }

    fn write_image(&self, name: &str, image: &RgbImage, quality: u8) -> BlendcastResult<()> {
        let bytes = encode_jpeg(image, quality)?;
        self.write_atomic(name, &bytes)
    }
}
