//! Live-stream result delivery
//!
//! The engine reports completions on its own thread. `LiveStreamAdapter`
//! turns each completion into at most one delegate call and runs that call
//! on a dedicated FIFO delivery queue, so delegate code never executes on
//! (or blocks) the engine thread.

use std::sync::{Arc, OnceLock, Weak};

use vision_tasks_core::graph::{GraphError, PacketsCallback};
use vision_tasks_core::task::DeliveryQueue;
use vision_tasks_core::{DetectionResult, Error, PacketMap, Result, UNSET_TIMESTAMP_MS};

use crate::detector::{DetectorInner, FaceDetector};
use crate::projector::project_detections;
use crate::streams::IMAGE_OUT_STREAM;

/// Name of the delivery queue's worker thread
pub const RESULTS_QUEUE_NAME: &str = "face-detector-results";

/// Receives face detector results in live-stream mode
///
/// Calls arrive on the detector's delivery thread, one at a time, in the
/// order frames were submitted. Frames the graph dropped produce no call.
pub trait FaceDetectorLiveStreamDelegate: Send + Sync {
    /// Called once per completed frame
    ///
    /// # Arguments
    ///
    /// * `detector` - The detector that produced the result
    /// * `result` - Detections for the frame, `None` on error
    /// * `timestamp_ms` - Frame timestamp in milliseconds, or
    ///   `UNSET_TIMESTAMP_MS` on error
    /// * `error` - Engine failure for the frame, if any
    fn on_result(
        &self,
        detector: &FaceDetector,
        result: Option<&DetectionResult>,
        timestamp_ms: i64,
        error: Option<&Error>,
    );
}

/// Bridges engine completions onto the delivery queue
///
/// Holds the detector and the delegate weakly; a delivery whose detector or
/// delegate is gone is skipped.
pub(crate) struct LiveStreamAdapter {
    queue: DeliveryQueue,
    owner: OnceLock<Weak<DetectorInner>>,
    delegate: Weak<dyn FaceDetectorLiveStreamDelegate>,
}

impl LiveStreamAdapter {
    /// Create the adapter and start its delivery queue
    pub(crate) fn new(delegate: Weak<dyn FaceDetectorLiveStreamDelegate>) -> Result<Arc<Self>> {
        Ok(Arc::new(Self {
            queue: DeliveryQueue::new(RESULTS_QUEUE_NAME)?,
            owner: OnceLock::new(),
            delegate,
        }))
    }

    /// Attach the detector handed to the delegate; first call wins
    pub(crate) fn bind(&self, owner: Weak<DetectorInner>) {
        if self.owner.set(owner).is_err() {
            tracing::warn!("LiveStreamAdapter already bound to a detector");
        }
    }

    /// Engine completion callback feeding this adapter
    pub(crate) fn callback(self: &Arc<Self>) -> PacketsCallback {
        let adapter = Arc::clone(self);
        Arc::new(move |outcome| adapter.on_engine_result(outcome))
    }

    /// Run all queued deliveries and stop the queue
    pub(crate) fn shutdown(&self) {
        self.queue.shutdown();
    }

    fn on_engine_result(&self, outcome: std::result::Result<PacketMap, GraphError>) {
        let outputs = match outcome {
            Ok(outputs) => outputs,
            Err(e) => return self.deliver_failure(e),
        };

        let Some(image) = outputs.get(IMAGE_OUT_STREAM) else {
            tracing::debug!("No {} packet; frame dropped by the graph", IMAGE_OUT_STREAM);
            return;
        };

        let Some(timestamp) = image.timestamp() else {
            return self.deliver_failure(GraphError::UnstampedOutput(IMAGE_OUT_STREAM.to_string()));
        };
        let timestamp_ms = timestamp.as_millis();
        let result = project_detections(&outputs);

        tracing::debug!(
            "Face detector frame at {}ms completed with {} detection(s)",
            timestamp_ms,
            result.len()
        );
        self.deliver(Some(result), timestamp_ms, None);
    }

    fn deliver_failure(&self, failure: GraphError) {
        let error = Error::from(failure);
        tracing::warn!("Face detector live-stream frame failed: {}", error);
        self.deliver(None, UNSET_TIMESTAMP_MS, Some(error));
    }

    fn deliver(&self, result: Option<DetectionResult>, timestamp_ms: i64, error: Option<Error>) {
        let owner = self.owner.get().cloned();
        let delegate = self.delegate.clone();

        let queued = self.queue.dispatch(move || {
            let Some(inner) = owner.and_then(|w| w.upgrade()) else {
                tracing::trace!("Face detector released before delivery at {}ms", timestamp_ms);
                return;
            };
            let Some(delegate) = delegate.upgrade() else {
                tracing::trace!("Live-stream delegate released before delivery at {}ms", timestamp_ms);
                return;
            };

            let detector = FaceDetector::from_inner(inner);
            delegate.on_result(&detector, result.as_ref(), timestamp_ms, error.as_ref());
        });

        if !queued {
            tracing::debug!("Delivery queue closed; result at {}ms not delivered", timestamp_ms);
        }
    }
}
