//! Raw camera frames
//!
//! A frame is shared between the sampling tick, the overlay and the
//! persistence worker, so it is reference counted and never mutated
//! after capture.

use std::fmt;
use std::sync::Arc;

use image::RgbImage;

use crate::{BlendcastError, BlendcastResult};

/// Full-resolution RGB8 camera frame
#[derive(Clone)]
pub struct RawFrame {
    image: Arc<RgbImage>,
}

impl RawFrame {
    pub fn new(image: RgbImage) -> Self {
        RawFrame {
            image: Arc::new(image),
        }
    }

    /// Build a frame from packed RGB8 bytes
    pub fn from_rgb8(width: u32, height: u32, pixels: Vec<u8>) -> BlendcastResult<Self> {
        let expected = width as usize * height as usize * 3;
        let actual = pixels.len();
        RgbImage::from_raw(width, height, pixels)
            .map(RawFrame::new)
            .ok_or_else(|| {
                BlendcastError::MalformedFrame(format!(
                    "{}x{} needs {} bytes, got {}",
                    width, height, expected, actual
                ))
            })
    }

    /// Uniformly filled frame, handy for synthetic sources
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        RawFrame::new(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    #[inline]
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// True if both handles point at the same captured frame
    #[inline]
    pub fn same_capture(&self, other: &RawFrame) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}

impl fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawFrame({}x{})", self.width(), self.height())
    }
}
