//! Shared fixtures for face detector integration tests
//!
//! Provides in-process calculators standing in for the face detection
//! model, and a delegate that forwards live-stream results over a channel.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use vision_tasks_core::graph::{Calculator, GraphError, LocalEngineFactory};
use vision_tasks_core::{Packet, PacketMap};
use vision_tasks_face_detector::{
    BoundingBox, Category, Detection, DetectionResult, Error, ExecutionMode, FaceDetector,
    FaceDetectorLiveStreamDelegate, ImageFrame,
};

pub const MODEL_PATH: &str = "face_detection_short_range.tflite";

/// How long a test waits for a delivery that should happen
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a test waits before concluding a delivery will not happen
pub const NO_DELIVERY_TIMEOUT: Duration = Duration::from_millis(200);

/// Passes the image through and finds no faces
pub struct BlankCalculator;

impl Calculator for BlankCalculator {
    fn name(&self) -> &str {
        "blank"
    }

    fn process(&self, inputs: &PacketMap) -> Result<PacketMap, GraphError> {
        let image = inputs
            .get("image_in")
            .cloned()
            .ok_or_else(|| GraphError::MissingInput("image_in".into()))?;

        let mut out = PacketMap::new();
        out.insert("image_out".to_string(), image);
        out.insert("detections_out".to_string(), Packet::detections(Vec::new()));
        Ok(out)
    }
}

/// Calculator driven by a closure
pub struct FnCalculator<F>(F);

impl<F> FnCalculator<F>
where
    F: Fn(&PacketMap) -> Result<PacketMap, GraphError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Calculator for FnCalculator<F>
where
    F: Fn(&PacketMap) -> Result<PacketMap, GraphError> + Send + Sync,
{
    fn name(&self) -> &str {
        "fn"
    }

    fn process(&self, inputs: &PacketMap) -> Result<PacketMap, GraphError> {
        (self.0)(inputs)
    }
}

/// Blocks each frame until the test opens the gate, then behaves like
/// `BlankCalculator`
pub struct GatedCalculator {
    gate: Receiver<()>,
    entered: Sender<()>,
}

/// Test side of a `GatedCalculator`
pub struct Gate {
    open: Sender<()>,
    entered: Receiver<()>,
}

impl GatedCalculator {
    pub fn new() -> (Self, Gate) {
        let (open_tx, open_rx) = channel::unbounded();
        let (entered_tx, entered_rx) = channel::unbounded();
        (
            Self {
                gate: open_rx,
                entered: entered_tx,
            },
            Gate {
                open: open_tx,
                entered: entered_rx,
            },
        )
    }
}

impl Calculator for GatedCalculator {
    fn name(&self) -> &str {
        "gated"
    }

    fn process(&self, inputs: &PacketMap) -> Result<PacketMap, GraphError> {
        let _ = self.entered.send(());
        self.gate
            .recv()
            .map_err(|_| GraphError::CalculatorFailed {
                node: "gated".to_string(),
                message: "gate dropped".to_string(),
            })?;
        BlankCalculator.process(inputs)
    }
}

impl Gate {
    /// Wait until a frame is blocked inside the calculator
    pub fn wait_entered(&self) {
        self.entered
            .recv_timeout(DELIVERY_TIMEOUT)
            .expect("calculator was never entered");
    }

    /// Let one frame through
    pub fn open_one(&self) {
        self.open.send(()).expect("calculator gone");
    }
}

/// Reports one face covering the top-left quarter of every frame
pub fn one_face_factory() -> LocalEngineFactory {
    LocalEngineFactory::new(FnCalculator::new(|inputs| {
        let mut out = BlankCalculator.process(inputs)?;
        out.insert(
            "detections_out".to_string(),
            Packet::detections(vec![face(0.92)]),
        );
        Ok(out)
    }))
}

/// A calculator failure on every frame
pub fn failing_factory() -> LocalEngineFactory {
    LocalEngineFactory::new(FnCalculator::new(|_| {
        Err(GraphError::CalculatorFailed {
            node: "face_detection".to_string(),
            message: "inference failed".to_string(),
        })
    }))
}

pub fn face(score: f32) -> Detection {
    Detection {
        categories: vec![Category {
            index: 0,
            score,
            category_name: Some("face".to_string()),
            display_name: None,
        }],
        bounding_box: BoundingBox {
            origin_x: 0,
            origin_y: 0,
            width: 50,
            height: 50,
        },
        keypoints: Vec::new(),
    }
}

/// Solid black RGB frame
pub fn blank_frame(width: u32, height: u32) -> ImageFrame {
    let image = image::RgbImage::new(width, height);
    ImageFrame::try_from(&image).expect("valid frame")
}

/// One recorded `on_result` call
#[derive(Debug)]
pub struct Delivery {
    pub result: Option<DetectionResult>,
    pub timestamp_ms: i64,
    pub error: Option<String>,
    pub engine_error: bool,
    pub thread: Option<String>,
    pub mode: ExecutionMode,
}

/// Delegate forwarding every call to a channel
pub struct RecordingDelegate {
    tx: Sender<Delivery>,
    /// When set, each call blocks after recording until released
    hold: Option<Receiver<()>>,
    /// When set, the first call panics after recording
    panic_first: AtomicBool,
}

impl RecordingDelegate {
    pub fn new() -> (Arc<Self>, Receiver<Delivery>) {
        let (tx, rx) = channel::unbounded();
        let delegate = Self {
            tx,
            hold: None,
            panic_first: AtomicBool::new(false),
        };
        (Arc::new(delegate), rx)
    }

    /// A delegate whose calls block until the returned sender releases them
    pub fn holding() -> (Arc<Self>, Receiver<Delivery>, Sender<()>) {
        let (tx, rx) = channel::unbounded();
        let (release_tx, release_rx) = channel::unbounded();
        let delegate = Self {
            tx,
            hold: Some(release_rx),
            panic_first: AtomicBool::new(false),
        };
        (Arc::new(delegate), rx, release_tx)
    }

    /// A delegate that panics on its first call
    pub fn panicking_once() -> (Arc<Self>, Receiver<Delivery>) {
        let (tx, rx) = channel::unbounded();
        let delegate = Self {
            tx,
            hold: None,
            panic_first: AtomicBool::new(true),
        };
        (Arc::new(delegate), rx)
    }
}

impl FaceDetectorLiveStreamDelegate for RecordingDelegate {
    fn on_result(
        &self,
        detector: &FaceDetector,
        result: Option<&DetectionResult>,
        timestamp_ms: i64,
        error: Option<&Error>,
    ) {
        let _ = self.tx.send(Delivery {
            result: result.cloned(),
            timestamp_ms,
            error: error.map(|e| e.to_string()),
            engine_error: matches!(error, Some(Error::EngineExecution(_))),
            thread: std::thread::current().name().map(str::to_string),
            mode: detector.running_mode(),
        });

        if let Some(hold) = &self.hold {
            let _ = hold.recv_timeout(DELIVERY_TIMEOUT);
        }
        if self.panic_first.swap(false, Ordering::SeqCst) {
            panic!("delegate failed on frame {}", timestamp_ms);
        }
    }
}
