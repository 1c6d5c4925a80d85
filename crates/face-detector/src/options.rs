//! Face detector options
//!
//! Options can be built in code or loaded from JSON/YAML files:
//!
//! ```yaml
//! base_options:
//!   model_asset_path: models/face_detection_short_range.tflite
//! running_mode: video
//! min_detection_confidence: 0.6
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use vision_tasks_core::{Error, ExecutionMode, Result};

use crate::live_stream::FaceDetectorLiveStreamDelegate;

/// Options shared by all tasks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseOptions {
    /// Path to the model asset loaded by the graph
    pub model_asset_path: PathBuf,
}

/// Configuration of a `FaceDetector`
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceDetectorOptions {
    pub base_options: BaseOptions,

    /// Execution mode, fixed for the detector's lifetime
    pub running_mode: ExecutionMode,

    /// Minimum confidence score for a face to be reported (0.0-1.0)
    pub min_detection_confidence: f32,

    /// Minimum IoU for two detections to be merged by non-max suppression
    /// (0.0-1.0)
    pub min_suppression_threshold: f32,

    /// Receiver of live-stream results. Held weakly: the detector never
    /// keeps the delegate alive. Required in `LiveStream` mode, rejected
    /// otherwise.
    #[serde(skip)]
    pub live_stream_delegate: Option<Weak<dyn FaceDetectorLiveStreamDelegate>>,
}

impl Default for FaceDetectorOptions {
    fn default() -> Self {
        Self {
            base_options: BaseOptions::default(),
            running_mode: ExecutionMode::Image,
            min_detection_confidence: 0.5,
            min_suppression_threshold: 0.3,
            live_stream_delegate: None,
        }
    }
}

impl fmt::Debug for FaceDetectorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaceDetectorOptions")
            .field("base_options", &self.base_options)
            .field("running_mode", &self.running_mode)
            .field("min_detection_confidence", &self.min_detection_confidence)
            .field("min_suppression_threshold", &self.min_suppression_threshold)
            .field("live_stream_delegate", &self.live_stream_delegate.is_some())
            .finish()
    }
}

impl FaceDetectorOptions {
    /// Default options for the model at `model_asset_path`
    pub fn new(model_asset_path: impl AsRef<Path>) -> Self {
        Self {
            base_options: BaseOptions {
                model_asset_path: model_asset_path.as_ref().to_path_buf(),
            },
            ..Default::default()
        }
    }

    /// Set running mode
    pub fn with_running_mode(mut self, mode: ExecutionMode) -> Self {
        self.running_mode = mode;
        self
    }

    /// Set minimum detection confidence
    pub fn with_min_detection_confidence(mut self, confidence: f32) -> Self {
        self.min_detection_confidence = confidence;
        self
    }

    /// Set minimum suppression threshold
    pub fn with_min_suppression_threshold(mut self, threshold: f32) -> Self {
        self.min_suppression_threshold = threshold;
        self
    }

    /// Register a live-stream delegate; only a weak reference is kept
    pub fn with_live_stream_delegate<D>(mut self, delegate: &Arc<D>) -> Self
    where
        D: FaceDetectorLiveStreamDelegate + 'static,
    {
        let weak: Weak<D> = Arc::downgrade(delegate);
        self.live_stream_delegate = Some(weak);
        self
    }

    /// Register an already downgraded live-stream delegate
    pub fn with_live_stream_delegate_weak(
        mut self,
        delegate: Weak<dyn FaceDetectorLiveStreamDelegate>,
    ) -> Self {
        self.live_stream_delegate = Some(delegate);
        self
    }

    /// Parse options from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse options from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load options from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("json") => Self::from_json_str(&contents),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents),
            _ => Err(Error::InvalidArgument(format!(
                "Unsupported options file '{}': expected .json, .yaml or .yml",
                path.display()
            ))),
        }
    }

    /// Check option values and delegate/mode consistency
    ///
    /// # Errors
    ///
    /// * `Error::InvalidArgument` - empty model path, a threshold outside
    ///   `[0, 1]`, a missing delegate in live-stream mode, or a delegate in
    ///   image/video mode
    pub fn validate(&self) -> Result<()> {
        if self.base_options.model_asset_path.as_os_str().is_empty() {
            return Err(Error::InvalidArgument(
                "base_options.model_asset_path must not be empty".to_string(),
            ));
        }

        for (name, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_suppression_threshold", self.min_suppression_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidArgument(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }

        match (self.running_mode, self.live_stream_delegate.is_some()) {
            (ExecutionMode::LiveStream, false) => Err(Error::InvalidArgument(
                "The face detector is in live stream mode; a live stream delegate must be set"
                    .to_string(),
            )),
            (ExecutionMode::Image | ExecutionMode::Video, true) => {
                Err(Error::InvalidArgument(format!(
                    "The face detector is in {} mode; a live stream delegate must not be set",
                    self.running_mode
                )))
            }
            _ => Ok(()),
        }
    }

    /// Options as handed to the graph (the delegate is not serialized)
    pub fn to_task_options(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
