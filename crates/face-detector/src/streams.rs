//! Stream names and graph configuration of the face detector graph
//!
//! The names are part of the engine protocol and must match the graph
//! definition exactly.

use vision_tasks_core::graph::{StreamBinding, TaskGraphConfig};
use vision_tasks_core::Result;

use crate::options::FaceDetectorOptions;

/// Graph executed by the engine
pub const GRAPH_NAME: &str = "vision_tasks.face_detector.FaceDetectorGraph";

pub const IMAGE_TAG: &str = "IMAGE";
pub const NORM_RECT_TAG: &str = "NORM_RECT";
pub const DETECTIONS_TAG: &str = "DETECTIONS";

pub const IMAGE_IN_STREAM: &str = "image_in";
pub const NORM_RECT_IN_STREAM: &str = "norm_rect_in";
pub const DETECTIONS_OUT_STREAM: &str = "detections_out";
/// Passthrough of the input image; its absence marks a dropped frame
pub const IMAGE_OUT_STREAM: &str = "image_out";

/// Build the graph config for `options`
///
/// Flow limiting is left to the task runner, which enables it for live
/// streams only.
pub fn graph_config(options: &FaceDetectorOptions) -> Result<TaskGraphConfig> {
    Ok(TaskGraphConfig::new(GRAPH_NAME)
        .with_input(StreamBinding::new(IMAGE_TAG, IMAGE_IN_STREAM))
        .with_input(StreamBinding::new(NORM_RECT_TAG, NORM_RECT_IN_STREAM))
        .with_output(StreamBinding::new(DETECTIONS_TAG, DETECTIONS_OUT_STREAM))
        .with_output(StreamBinding::new(IMAGE_TAG, IMAGE_OUT_STREAM))
        .with_task_options(options.to_task_options()?))
}
