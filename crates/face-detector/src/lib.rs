//! Face detector task built on `vision-tasks-core`
//!
//! Detects faces in still images, decoded video frames and live camera
//! streams. Each call is marshalled into the `image_in` / `norm_rect_in`
//! packet map, run through the face detection graph, and the
//! `detections_out` stream is projected into a `DetectionResult`.
//!
//! ```text
//! ImageFrame ──▶ packets ──▶ TaskRunner ──▶ graph ──▶ projector ──▶ DetectionResult
//!                                              │
//!                         LiveStream ──▶ LiveStreamAdapter ──▶ delegate.on_result
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vision_tasks_face_detector::{FaceDetector, FaceDetectorOptions};
//! use vision_tasks_core::ExecutionMode;
//!
//! let options = FaceDetectorOptions::new("face_detection_short_range.tflite")
//!     .with_running_mode(ExecutionMode::Video)
//!     .with_min_detection_confidence(0.6);
//! let detector = FaceDetector::new(options, &factory)?;
//!
//! for (frame, timestamp_ms) in frames {
//!     let result = detector.detect_for_video(&frame, timestamp_ms)?;
//!     println!("{} face(s) at {}ms", result.len(), timestamp_ms);
//! }
//! ```

#![warn(clippy::all)]

mod detector;
mod live_stream;
mod options;
pub mod packets;
pub mod projector;
pub mod streams;

pub use detector::FaceDetector;
pub use live_stream::{FaceDetectorLiveStreamDelegate, RESULTS_QUEUE_NAME};
pub use options::{BaseOptions, FaceDetectorOptions};

pub use vision_tasks_core::{
    BoundingBox, Category, Detection, DetectionResult, Error, ExecutionMode, ImageFormat,
    ImageFrame, ImageOrientation, NormalizedKeypoint, Result, UNSET_TIMESTAMP_MS,
};
