//! Image payloads submitted to vision graphs
//!
//! `ImageFrame` is the only image representation the task runner knows.
//! Conversions from the `image` crate are provided for convenience.

use bytes::Bytes;
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Pixel layout of an `ImageFrame`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    /// 8-bit grayscale
    Gray8,
    /// RGB with 8 bits per channel
    #[default]
    Rgb8,
    /// RGBA with 8 bits per channel
    Rgba8,
    /// BGRA with 8 bits per channel (common camera capture layout)
    Bgra8,
}

impl ImageFormat {
    /// Bytes per pixel
    pub fn channels(&self) -> usize {
        match self {
            ImageFormat::Gray8 => 1,
            ImageFormat::Rgb8 => 3,
            ImageFormat::Rgba8 | ImageFormat::Bgra8 => 4,
        }
    }
}

/// Orientation of the displayed image relative to the stored pixels
///
/// Mirrors EXIF orientation semantics. Vision tasks only accept the four
/// rotations; mirrored variants are rejected during region normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageOrientation {
    /// Pixels are displayed as stored
    #[default]
    Up,
    /// Displayed image is the stored image rotated 90 degrees clockwise
    Right,
    /// Displayed image is the stored image rotated 180 degrees
    Down,
    /// Displayed image is the stored image rotated 90 degrees counter-clockwise
    Left,
    UpMirrored,
    RightMirrored,
    DownMirrored,
    LeftMirrored,
}

impl ImageOrientation {
    /// Whether this orientation includes a horizontal flip
    pub fn is_mirrored(&self) -> bool {
        matches!(
            self,
            ImageOrientation::UpMirrored
                | ImageOrientation::RightMirrored
                | ImageOrientation::DownMirrored
                | ImageOrientation::LeftMirrored
        )
    }
}

/// An immutable, cheaply clonable image buffer
///
/// The pixel buffer is reference counted, so cloning a frame (or the packet
/// wrapping it) never copies pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    width: u32,
    height: u32,
    format: ImageFormat,
    data: Bytes,
    orientation: ImageOrientation,
}

impl ImageFrame {
    /// Create a frame from tightly packed pixel data
    ///
    /// # Errors
    ///
    /// * `Error::InvalidArgument` - zero dimension, or the buffer length does
    ///   not match `width * height * channels`
    pub fn new(width: u32, height: u32, format: ImageFormat, data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();

        if width == 0 || height == 0 {
            return Err(Error::InvalidArgument(format!(
                "Image dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }

        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(format.channels()))
            .ok_or_else(|| {
                Error::InvalidArgument(format!("Image {}x{} is too large", width, height))
            })?;

        if data.len() != expected {
            return Err(Error::InvalidArgument(format!(
                "Image buffer has {} bytes, expected {} for {}x{} {:?}",
                data.len(),
                expected,
                width,
                height,
                format
            )));
        }

        Ok(Self {
            width,
            height,
            format,
            data,
            orientation: ImageOrientation::Up,
        })
    }

    /// Builder pattern: set display orientation
    pub fn with_orientation(mut self, orientation: ImageOrientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)` in pixels
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn orientation(&self) -> ImageOrientation {
        self.orientation
    }

    /// Raw pixel bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl TryFrom<&RgbImage> for ImageFrame {
    type Error = Error;

    fn try_from(image: &RgbImage) -> Result<Self> {
        ImageFrame::new(
            image.width(),
            image.height(),
            ImageFormat::Rgb8,
            image.as_raw().clone(),
        )
    }
}

impl TryFrom<&DynamicImage> for ImageFrame {
    type Error = Error;

    fn try_from(image: &DynamicImage) -> Result<Self> {
        let (width, height) = (image.width(), image.height());
        match image {
            DynamicImage::ImageLuma8(buf) => {
                ImageFrame::new(width, height, ImageFormat::Gray8, buf.as_raw().clone())
            }
            DynamicImage::ImageRgb8(buf) => {
                ImageFrame::new(width, height, ImageFormat::Rgb8, buf.as_raw().clone())
            }
            DynamicImage::ImageRgba8(buf) => {
                ImageFrame::new(width, height, ImageFormat::Rgba8, buf.as_raw().clone())
            }
            other => Err(Error::InvalidArgument(format!(
                "Unsupported pixel type {:?}; convert to 8-bit gray, RGB or RGBA first",
                other.color()
            ))),
        }
    }
}
