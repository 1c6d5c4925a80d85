//! Live-stream mode: asynchronous submission with ordered delegate delivery

mod common;

use std::sync::Arc;

use common::*;
use vision_tasks_core::graph::{
    GraphEngine, GraphEngineFactory, GraphError, LocalEngineFactory, PacketsCallback,
    TaskGraphConfig,
};
use vision_tasks_core::{Packet, PacketMap};
use vision_tasks_face_detector::streams::{DETECTIONS_OUT_STREAM, IMAGE_IN_STREAM, IMAGE_OUT_STREAM};
use vision_tasks_face_detector::{
    Error, ExecutionMode, FaceDetector, FaceDetectorOptions, RESULTS_QUEUE_NAME,
    UNSET_TIMESTAMP_MS,
};

fn live_detector(factory: &dyn GraphEngineFactory, delegate: &Arc<RecordingDelegate>) -> FaceDetector {
    let options = FaceDetectorOptions::new(MODEL_PATH)
        .with_running_mode(ExecutionMode::LiveStream)
        .with_live_stream_delegate(delegate);
    FaceDetector::new(options, factory).expect("live-stream detector")
}

#[test]
fn test_results_delivered_in_submission_order() {
    let factory = one_face_factory();
    let (delegate, rx) = RecordingDelegate::new();
    let detector = live_detector(&factory, &delegate);
    let frame = blank_frame(100, 100);

    let mut accepted = Vec::new();
    for ts in [10, 20] {
        if detector.detect_async(&frame, ts).unwrap() {
            accepted.push(ts);
        }
    }
    assert!(!accepted.is_empty());
    detector.close().unwrap();

    let delivered: Vec<i64> = rx.try_iter().map(|d| d.timestamp_ms).collect();
    assert!(delivered.len() <= 2);
    assert_eq!(delivered, accepted);
}

#[test]
fn test_delivery_runs_on_results_queue() {
    let factory = one_face_factory();
    let (delegate, rx) = RecordingDelegate::new();
    let detector = live_detector(&factory, &delegate);

    assert!(detector.detect_async(&blank_frame(64, 64), 7).unwrap());

    let delivery = rx.recv_timeout(DELIVERY_TIMEOUT).unwrap();
    assert_eq!(delivery.thread.as_deref(), Some(RESULTS_QUEUE_NAME));
    assert_eq!(delivery.timestamp_ms, 7);
    assert_eq!(delivery.mode, ExecutionMode::LiveStream);
    assert!(delivery.error.is_none());
    assert_eq!(delivery.result.map(|r| r.len()), Some(1));
}

#[test]
fn test_frame_dropped_by_graph_is_not_delivered() {
    let factory = LocalEngineFactory::new(FnCalculator::new(|_: &PacketMap| Ok(PacketMap::new())));
    let (delegate, rx) = RecordingDelegate::new();
    let detector = live_detector(&factory, &delegate);

    assert!(detector.detect_async(&blank_frame(16, 16), 1).unwrap());
    detector.close().unwrap();

    assert!(rx.recv_timeout(NO_DELIVERY_TIMEOUT).is_err());
}

#[test]
fn test_failure_delivered_once_without_result() {
    let factory = failing_factory();
    let (delegate, rx) = RecordingDelegate::new();
    let detector = live_detector(&factory, &delegate);

    assert!(detector.detect_async(&blank_frame(16, 16), 3).unwrap());
    detector.close().unwrap();

    let deliveries: Vec<Delivery> = rx.try_iter().collect();
    assert_eq!(deliveries.len(), 1);
    let delivery = &deliveries[0];
    assert!(delivery.result.is_none());
    assert_eq!(delivery.timestamp_ms, UNSET_TIMESTAMP_MS);
    assert!(delivery.engine_error);
}

#[test]
fn test_refused_while_previous_frame_in_flight() {
    let (calculator, gate) = GatedCalculator::new();
    let factory = LocalEngineFactory::new(calculator);
    let (delegate, rx) = RecordingDelegate::new();
    let detector = live_detector(&factory, &delegate);
    let frame = blank_frame(16, 16);

    assert!(detector.detect_async(&frame, 1).unwrap());
    gate.wait_entered();
    assert!(!detector.detect_async(&frame, 2).unwrap());

    gate.open_one();
    let delivery = rx.recv_timeout(DELIVERY_TIMEOUT).unwrap();
    assert_eq!(delivery.timestamp_ms, 1);

    // Admitted again once the first frame completed
    assert!(detector.detect_async(&frame, 3).unwrap());
    gate.wait_entered();
    gate.open_one();
    assert_eq!(rx.recv_timeout(DELIVERY_TIMEOUT).unwrap().timestamp_ms, 3);
}

#[test]
fn test_released_delegate_receives_nothing() {
    let factory = one_face_factory();
    let (delegate, rx) = RecordingDelegate::new();
    let detector = live_detector(&factory, &delegate);
    drop(delegate);

    assert!(detector.detect_async(&blank_frame(16, 16), 1).unwrap());
    detector.close().unwrap();

    assert!(rx.recv_timeout(NO_DELIVERY_TIMEOUT).is_err());
}

#[test]
fn test_frames_after_release_are_not_delivered() {
    let factory = one_face_factory();
    let (delegate, rx, release) = RecordingDelegate::holding();
    let detector = live_detector(&factory, &delegate);
    let frame = blank_frame(16, 16);

    // Frame 1 is held inside the delegate, which keeps the detector alive
    assert!(detector.detect_async(&frame, 1).unwrap());
    assert_eq!(rx.recv_timeout(DELIVERY_TIMEOUT).unwrap().timestamp_ms, 1);

    // No longer in flight once its delivery started
    assert!(detector.detect_async(&frame, 2).unwrap());

    // The held delivery now owns the last handle
    drop(detector);
    release.send(()).unwrap();

    assert!(rx.recv_timeout(NO_DELIVERY_TIMEOUT).is_err());
}

#[test]
fn test_panicking_delegate_keeps_receiving() {
    let factory = one_face_factory();
    let (delegate, rx) = RecordingDelegate::panicking_once();
    let detector = live_detector(&factory, &delegate);
    let frame = blank_frame(16, 16);

    assert!(detector.detect_async(&frame, 1).unwrap());
    assert_eq!(rx.recv_timeout(DELIVERY_TIMEOUT).unwrap().timestamp_ms, 1);

    assert!(detector.detect_async(&frame, 2).unwrap());
    let delivery = rx.recv_timeout(DELIVERY_TIMEOUT).unwrap();
    assert_eq!(delivery.timestamp_ms, 2);
    assert_eq!(delivery.result.map(|r| r.len()), Some(1));

    detector.close().unwrap();
}

#[test]
fn test_out_of_range_timestamp_rejected() {
    let factory = one_face_factory();
    let (delegate, rx) = RecordingDelegate::new();
    let detector = live_detector(&factory, &delegate);
    let frame = blank_frame(16, 16);

    let err = detector.detect_async(&frame, 922_337_203_685_477_580).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)), "got {:?}", err);
    let err = detector.detect_async(&frame, i64::MAX).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)), "got {:?}", err);

    detector.close().unwrap();
    assert!(rx.recv_timeout(NO_DELIVERY_TIMEOUT).is_err());
}

/// Echoes each frame back synchronously with an unstamped `image_out`
struct UnstampedEngine {
    callback: PacketsCallback,
}

impl GraphEngine for UnstampedEngine {
    fn submit_sync(&self, _packets: PacketMap) -> Result<PacketMap, GraphError> {
        Err(GraphError::WorkerUnavailable("sync execution".to_string()))
    }

    fn submit_async(&self, packets: PacketMap) -> Result<bool, GraphError> {
        let image = packets
            .get(IMAGE_IN_STREAM)
            .cloned()
            .ok_or_else(|| GraphError::MissingInput(IMAGE_IN_STREAM.to_string()))?;

        let mut out = PacketMap::new();
        out.insert(IMAGE_OUT_STREAM.to_string(), Packet::new(image.into_payload()));
        out.insert(DETECTIONS_OUT_STREAM.to_string(), Packet::detections(vec![face(0.9)]));
        (self.callback)(Ok(out));
        Ok(true)
    }

    fn close(&self) -> Result<(), GraphError> {
        Ok(())
    }
}

struct UnstampedFactory;

impl GraphEngineFactory for UnstampedFactory {
    fn create(
        &self,
        _config: TaskGraphConfig,
        callback: Option<PacketsCallback>,
    ) -> Result<Box<dyn GraphEngine>, GraphError> {
        let callback = callback.ok_or_else(|| GraphError::WorkerUnavailable("no callback".to_string()))?;
        Ok(Box::new(UnstampedEngine { callback }))
    }
}

#[test]
fn test_unstamped_output_delivered_as_failure() {
    let (delegate, rx) = RecordingDelegate::new();
    let detector = live_detector(&UnstampedFactory, &delegate);

    assert!(detector.detect_async(&blank_frame(16, 16), 4).unwrap());
    detector.close().unwrap();

    let deliveries: Vec<Delivery> = rx.try_iter().collect();
    assert_eq!(deliveries.len(), 1);
    let delivery = &deliveries[0];
    assert!(delivery.result.is_none());
    assert_eq!(delivery.timestamp_ms, UNSET_TIMESTAMP_MS);
    assert!(delivery.engine_error);
    assert!(delivery.error.as_deref().unwrap().contains(IMAGE_OUT_STREAM));
}

#[test]
fn test_delegate_required() {
    let factory = LocalEngineFactory::new(BlankCalculator);
    let options = FaceDetectorOptions::new(MODEL_PATH).with_running_mode(ExecutionMode::LiveStream);

    assert!(matches!(
        FaceDetector::new(options, &factory),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn test_synchronous_operations_rejected() {
    let factory = LocalEngineFactory::new(BlankCalculator);
    let (delegate, rx) = RecordingDelegate::new();
    let detector = live_detector(&factory, &delegate);
    let frame = blank_frame(16, 16);

    assert!(detector.detect(&frame).unwrap_err().is_precondition_failed());
    assert!(detector
        .detect_for_video(&frame, 0)
        .unwrap_err()
        .is_precondition_failed());
    detector.close().unwrap();

    assert!(rx.try_recv().is_err());
}

#[test]
fn test_detect_async_after_close_fails() {
    let factory = LocalEngineFactory::new(BlankCalculator);
    let (delegate, _rx) = RecordingDelegate::new();
    let detector = live_detector(&factory, &delegate);

    detector.close().unwrap();
    let err = detector.detect_async(&blank_frame(16, 16), 1).unwrap_err();
    assert!(matches!(err, Error::EngineExecution(_)));
}
