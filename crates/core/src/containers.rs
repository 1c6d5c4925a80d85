//! Detection result containers shared by vision tasks

use serde::{Deserialize, Serialize};

/// A classification attached to a detection
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Category {
    /// Index of the class in the model's label map (-1 if unknown)
    pub index: i32,
    /// Confidence score 0.0-1.0
    pub score: f32,
    pub category_name: Option<String>,
    pub display_name: Option<String>,
}

/// Bounding box in pixel coordinates of the input image
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X coordinate of top-left corner (pixels)
    pub origin_x: i32,
    /// Y coordinate of top-left corner (pixels)
    pub origin_y: i32,
    pub width: i32,
    pub height: i32,
}

/// Landmark in normalized image coordinates
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedKeypoint {
    pub x: f32,
    pub y: f32,
    pub label: Option<String>,
    pub score: Option<f32>,
}

/// A single detected object
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Detection {
    /// Classifications, highest score first
    pub categories: Vec<Category>,
    pub bounding_box: BoundingBox,
    /// Optional landmarks (face detectors emit six)
    pub keypoints: Vec<NormalizedKeypoint>,
}

impl Detection {
    /// Highest category score, or 0.0 if there are no categories
    pub fn confidence(&self) -> f32 {
        self.categories
            .iter()
            .map(|c| c.score)
            .fold(0.0, f32::max)
    }
}

/// Ordered list of detections produced for one image or frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }
}
