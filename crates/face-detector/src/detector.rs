//! The face detector task

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use vision_tasks_core::graph::GraphEngineFactory;
use vision_tasks_core::{
    DefaultRegionNormalizer, DetectionResult, ExecutionMode, ImageFrame, Result,
    TaskRunner, Timestamp,
};

use crate::live_stream::LiveStreamAdapter;
use crate::options::FaceDetectorOptions;
use crate::packets::build_input_packets;
use crate::projector::project_detections;
use crate::streams;

/// Detects faces in images, decoded video frames or live streams
///
/// The execution mode is chosen once through `FaceDetectorOptions` and
/// decides which detection method may be called:
///
/// | Mode | Method | Result |
/// |---|---|---|
/// | `Image` | `detect` | returned |
/// | `Video` | `detect_for_video` | returned, frames in timestamp order |
/// | `LiveStream` | `detect_async` | delivered to the delegate |
///
/// Calling another mode's method fails with `Error::PreconditionFailed`.
///
/// # Example
///
/// ```ignore
/// let detector = FaceDetector::from_model_path("face_detection.tflite", &factory)?;
/// let result = detector.detect(&frame)?;
/// for detection in &result.detections {
///     println!("{:?} ({:.2})", detection.bounding_box, detection.confidence());
/// }
/// ```
///
/// Clones share the same underlying graph.
#[derive(Clone)]
pub struct FaceDetector {
    inner: Arc<DetectorInner>,
}

pub(crate) struct DetectorInner {
    // Declared before `adapter`: the engine stops before the delivery queue.
    runner: TaskRunner,
    adapter: Option<Arc<LiveStreamAdapter>>,
    normalizer: DefaultRegionNormalizer,
    options: FaceDetectorOptions,
}

impl FaceDetector {
    /// Create a detector from full options
    ///
    /// # Errors
    ///
    /// * `Error::InvalidArgument` - invalid options (see
    ///   `FaceDetectorOptions::validate`)
    /// * `Error::ResourceCreation` - the delivery queue could not start
    /// * `Error::EngineExecution` - the engine could not be created
    pub fn new(options: FaceDetectorOptions, factory: &dyn GraphEngineFactory) -> Result<Self> {
        options.validate()?;
        let config = streams::graph_config(&options)?;

        let adapter = match (&options.live_stream_delegate, options.running_mode) {
            (Some(delegate), ExecutionMode::LiveStream) => {
                Some(LiveStreamAdapter::new(delegate.clone())?)
            }
            _ => None,
        };
        let callback = adapter.as_ref().map(|a| a.callback());

        let runner = TaskRunner::new(config, options.running_mode, callback, factory)?;

        let inner = Arc::new(DetectorInner {
            runner,
            adapter,
            normalizer: DefaultRegionNormalizer,
            options,
        });
        if let Some(adapter) = &inner.adapter {
            adapter.bind(Arc::downgrade(&inner));
        }

        tracing::info!(
            "FaceDetector created for model {} in {} mode",
            inner.options.base_options.model_asset_path.display(),
            inner.options.running_mode
        );

        Ok(Self { inner })
    }

    /// Create an image-mode detector with default options
    pub fn from_model_path(
        model_asset_path: impl AsRef<Path>,
        factory: &dyn GraphEngineFactory,
    ) -> Result<Self> {
        Self::new(FaceDetectorOptions::new(model_asset_path), factory)
    }

    pub(crate) fn from_inner(inner: Arc<DetectorInner>) -> Self {
        Self { inner }
    }

    /// Execution mode fixed at construction
    pub fn running_mode(&self) -> ExecutionMode {
        self.inner.runner.mode()
    }

    pub fn options(&self) -> &FaceDetectorOptions {
        &self.inner.options
    }

    /// Detect faces in a single image (image mode)
    ///
    /// Blocks until the graph returns. Calls are independent of each other.
    pub fn detect(&self, image: &ImageFrame) -> Result<DetectionResult> {
        self.inner.runner.ensure_mode(ExecutionMode::Image)?;

        let packets = build_input_packets(image, None, None, &self.inner.normalizer)?;
        let outputs = self.inner.runner.process_once(packets)?;
        Ok(project_detections(&outputs))
    }

    /// Detect faces in one decoded video frame (video mode)
    ///
    /// `timestamp_ms` must not decrease across calls. Timestamps too large
    /// to express in microseconds fail with `Error::InvalidArgument`.
    pub fn detect_for_video(&self, image: &ImageFrame, timestamp_ms: i64) -> Result<DetectionResult> {
        self.inner.runner.ensure_mode(ExecutionMode::Video)?;

        let timestamp = Timestamp::from_millis(timestamp_ms)?;
        let packets = build_input_packets(image, None, Some(timestamp), &self.inner.normalizer)?;
        let outputs = self.inner.runner.process_stream(packets)?;
        Ok(project_detections(&outputs))
    }

    /// Submit one live frame (live-stream mode)
    ///
    /// Returns immediately. `Ok(false)` means the frame was refused because
    /// the previous one is still being processed. Results and execution
    /// errors reach the delegate. Out-of-range timestamps fail here with
    /// `Error::InvalidArgument` and are never submitted.
    pub fn detect_async(&self, image: &ImageFrame, timestamp_ms: i64) -> Result<bool> {
        self.inner.runner.ensure_mode(ExecutionMode::LiveStream)?;

        let timestamp = Timestamp::from_millis(timestamp_ms)?;
        let packets = build_input_packets(image, None, Some(timestamp), &self.inner.normalizer)?;
        let accepted = self.inner.runner.process_async(packets)?;
        if !accepted {
            tracing::debug!("Live frame at {}ms refused under flow limiting", timestamp_ms);
        }
        Ok(accepted)
    }

    /// Stop the graph and flush pending live-stream deliveries
    ///
    /// Further detection calls fail with `Error::EngineExecution`.
    pub fn close(&self) -> Result<()> {
        let closed = self.inner.runner.close();
        if let Some(adapter) = &self.inner.adapter {
            adapter.shutdown();
        }
        closed.map_err(|e| {
            tracing::warn!("FaceDetector close failed: {}", e);
            e
        })?;

        tracing::info!("FaceDetector closed");
        Ok(())
    }
}

impl fmt::Debug for FaceDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaceDetector")
            .field("options", &self.inner.options)
            .finish()
    }
}
