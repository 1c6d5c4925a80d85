//! Region-of-interest geometry and normalization
//!
//! Vision graphs take the region to process as a `NormalizedRect` packet
//! expressed in unit-square coordinates of the stored (unrotated) image,
//! plus a rotation that undoes the display orientation.

use std::f32::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

use crate::frame::ImageOrientation;
use crate::{Error, Result};

/// Axis-aligned rectangle in normalized display coordinates
///
/// `x`/`y` are the top-left corner; all values are fractions of the
/// displayed image size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Rotated rectangle in normalized coordinates of the stored image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x_center: f32,
    pub y_center: f32,
    pub width: f32,
    pub height: f32,
    /// Rotation in radians, counter-clockwise positive
    pub rotation: f32,
}

impl NormalizedRect {
    /// The whole image, with the given rotation
    pub fn full_image(rotation: f32) -> Self {
        Self {
            x_center: 0.5,
            y_center: 0.5,
            width: 1.0,
            height: 1.0,
            rotation,
        }
    }
}

/// Converts a raw region of interest into the rectangle packet payload
pub trait RegionNormalizer: Send + Sync {
    /// Normalize `roi` for an image of `image_size` pixels shown with
    /// `orientation`
    ///
    /// `roi = None` means the whole image. Tasks that do not support a
    /// region of interest pass `roi_allowed = false`, which turns any
    /// explicit region into an `InvalidArgument` error.
    fn normalize(
        &self,
        roi: Option<Rect>,
        image_size: (u32, u32),
        orientation: ImageOrientation,
        roi_allowed: bool,
    ) -> Result<NormalizedRect>;
}

/// Default normalizer: orientation to rotation, ROI mapped into stored-image
/// coordinates
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRegionNormalizer;

impl DefaultRegionNormalizer {
    fn rotation_for(orientation: ImageOrientation) -> Result<f32> {
        match orientation {
            ImageOrientation::Up => Ok(0.0),
            ImageOrientation::Right => Ok(-FRAC_PI_2),
            ImageOrientation::Down => Ok(PI),
            ImageOrientation::Left => Ok(FRAC_PI_2),
            mirrored => Err(Error::InvalidArgument(format!(
                "Unsupported image orientation {:?}: mirrored orientations are not supported",
                mirrored
            ))),
        }
    }
}

impl RegionNormalizer for DefaultRegionNormalizer {
    fn normalize(
        &self,
        roi: Option<Rect>,
        image_size: (u32, u32),
        orientation: ImageOrientation,
        roi_allowed: bool,
    ) -> Result<NormalizedRect> {
        let (width, height) = image_size;
        if width == 0 || height == 0 {
            return Err(Error::InvalidArgument(format!(
                "Cannot normalize a region for a {}x{} image",
                width, height
            )));
        }

        let rotation = Self::rotation_for(orientation)?;

        let Some(roi) = roi else {
            return Ok(NormalizedRect::full_image(rotation));
        };

        if !roi_allowed {
            return Err(Error::InvalidArgument(
                "This task doesn't support region-of-interest".to_string(),
            ));
        }

        let finite = [roi.x, roi.y, roi.width, roi.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite || roi.width <= 0.0 || roi.height <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "Region of interest must have a positive finite size, got {:?}",
                roi
            )));
        }
        if roi.x < 0.0 || roi.y < 0.0 || roi.x + roi.width > 1.0 || roi.y + roi.height > 1.0 {
            return Err(Error::InvalidArgument(format!(
                "Region of interest {:?} lies outside the image",
                roi
            )));
        }

        // Center in display coordinates, mapped back onto stored pixels.
        let u = roi.x + roi.width / 2.0;
        let v = roi.y + roi.height / 2.0;
        let (x_center, y_center, rect_width, rect_height) = match orientation {
            ImageOrientation::Right => (v, 1.0 - u, roi.height, roi.width),
            ImageOrientation::Down => (1.0 - u, 1.0 - v, roi.width, roi.height),
            ImageOrientation::Left => (1.0 - v, u, roi.height, roi.width),
            _ => (u, v, roi.width, roi.height),
        };

        Ok(NormalizedRect {
            x_center,
            y_center,
            width: rect_width,
            height: rect_height,
            rotation,
        })
    }
}
