//! Projection of graph outputs into detection results

use vision_tasks_core::{DetectionResult, PacketMap, Payload};

use crate::streams::DETECTIONS_OUT_STREAM;

/// Read the detections stream out of an output packet map
///
/// A missing or empty detections packet is an empty result, never an error.
pub fn project_detections(outputs: &PacketMap) -> DetectionResult {
    match outputs.get(DETECTIONS_OUT_STREAM).map(|p| p.payload()) {
        Some(Payload::Detections(detections)) => DetectionResult::new(detections.clone()),
        Some(Payload::Empty) | None => DetectionResult::default(),
        Some(other) => {
            tracing::debug!(
                "Ignoring {} payload on {}; reporting no detections",
                other.kind(),
                DETECTIONS_OUT_STREAM
            );
            DetectionResult::default()
        }
    }
}
