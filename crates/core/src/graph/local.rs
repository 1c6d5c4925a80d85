//! In-process graph engine
//!
//! Runs a single `Calculator` over each submitted packet map. Synchronous
//! submissions execute on the caller's thread; async submissions are queued
//! to a dedicated `graph-engine` worker thread and complete through the
//! registered callback in FIFO order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use super::{GraphEngine, GraphEngineFactory, GraphError, PacketsCallback, TaskGraphConfig};
use crate::packet::{PacketMap, Timestamp};

/// Computation executed by `LocalGraphEngine`
///
/// Receives the validated input map (keyed by input stream name) and
/// returns packets keyed by output stream name. Outputs without a timestamp
/// are stamped with the input timestamp; outputs for undeclared streams are
/// discarded.
pub trait Calculator: Send + Sync {
    /// Node name used in logs and errors
    fn name(&self) -> &str {
        "calculator"
    }

    fn process(&self, inputs: &PacketMap) -> Result<PacketMap, GraphError>;
}

/// State shared between the engine handle and its worker
struct EngineShared {
    config: TaskGraphConfig,
    calculator: Arc<dyn Calculator>,
    callback: Option<PacketsCallback>,
    last_timestamp: Mutex<Option<Timestamp>>,
    in_flight: AtomicBool,
    closed: AtomicBool,
}

impl EngineShared {
    /// Validate stream names and timestamps of one submission
    fn check_inputs(&self, packets: &PacketMap) -> Result<Option<Timestamp>, GraphError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(GraphError::Closed);
        }

        for binding in &self.config.input_streams {
            if !packets.contains_key(&binding.name) {
                return Err(GraphError::MissingInput(binding.name.clone()));
            }
        }

        let mut timestamp = None;
        for (name, packet) in packets {
            if !self.config.has_input(name) {
                return Err(GraphError::UnknownInput(name.clone()));
            }
            match (timestamp, packet.timestamp()) {
                (None, ts) => timestamp = Some(ts),
                (Some(expected), ts) if expected != ts => {
                    return Err(GraphError::TimestampMismatch(format!(
                        "stream '{}' has {:?}, expected {:?}",
                        name, ts, expected
                    )));
                }
                _ => {}
            }
        }

        Ok(timestamp.flatten())
    }

    /// Record an accepted timestamp, rejecting ones that go backwards
    fn record_timestamp(&self, timestamp: Option<Timestamp>) -> Result<(), GraphError> {
        let Some(current) = timestamp else {
            return Ok(());
        };

        let mut last = self.last_timestamp.lock();
        if let Some(previous) = *last {
            if current < previous {
                return Err(GraphError::NonMonotonicTimestamp { previous, current });
            }
        }
        *last = Some(current);
        Ok(())
    }

    fn run(&self, packets: PacketMap, timestamp: Option<Timestamp>) -> Result<PacketMap, GraphError> {
        let outputs = self.calculator.process(&packets)?;

        let mut result = PacketMap::with_capacity(outputs.len());
        for (name, packet) in outputs {
            if !self.config.has_output(&name) {
                tracing::debug!(
                    "Graph {}: discarding packet for undeclared output '{}'",
                    self.config.graph_name,
                    name
                );
                continue;
            }
            let packet = match (packet.timestamp(), timestamp) {
                (None, Some(ts)) => packet.at(ts),
                _ => packet,
            };
            result.insert(name, packet);
        }

        Ok(result)
    }
}

/// In-process `GraphEngine` backed by a `Calculator`
pub struct LocalGraphEngine {
    shared: Arc<EngineShared>,
    jobs: Mutex<Option<Sender<(PacketMap, Option<Timestamp>)>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LocalGraphEngine {
    /// Create an engine for `config`
    ///
    /// A worker thread is started only when a completion `callback` is
    /// given, since only async submissions need one.
    ///
    /// # Errors
    ///
    /// * `GraphError::WorkerUnavailable` - the worker thread failed to spawn
    pub fn new(
        config: TaskGraphConfig,
        calculator: Arc<dyn Calculator>,
        callback: Option<PacketsCallback>,
    ) -> Result<Self, GraphError> {
        let has_callback = callback.is_some();
        let shared = Arc::new(EngineShared {
            config,
            calculator,
            callback,
            last_timestamp: Mutex::new(None),
            in_flight: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });

        let (jobs, worker) = if has_callback {
            let (tx, rx) = channel::unbounded();
            let worker_shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name("graph-engine".to_string())
                .spawn(move || Self::worker_loop(worker_shared, rx))
                .map_err(|e| GraphError::WorkerUnavailable(e.to_string()))?;
            (Some(tx), Some(handle))
        } else {
            (None, None)
        };

        tracing::info!(
            "LocalGraphEngine created for graph {} (flow limiting: {}, async: {})",
            shared.config.graph_name,
            shared.config.enable_flow_limiting,
            has_callback
        );

        Ok(Self {
            shared,
            jobs: Mutex::new(jobs),
            worker: Mutex::new(worker),
        })
    }

    /// Graph configuration this engine was created with
    pub fn config(&self) -> &TaskGraphConfig {
        &self.shared.config
    }

    fn worker_loop(shared: Arc<EngineShared>, jobs: Receiver<(PacketMap, Option<Timestamp>)>) {
        tracing::debug!("Graph {} worker started", shared.config.graph_name);

        for (packets, timestamp) in jobs.iter() {
            let outcome = shared.run(packets, timestamp);
            if let Err(e) = &outcome {
                tracing::warn!(
                    "Graph {} failed at {:?}: {}",
                    shared.config.graph_name,
                    timestamp,
                    e
                );
            }

            // The pipeline for this timestamp is complete; admit the next one
            // before handing results out.
            shared.in_flight.store(false, Ordering::Release);

            if let Some(callback) = &shared.callback {
                callback(outcome);
            }
        }

        tracing::debug!("Graph {} worker stopped", shared.config.graph_name);
    }
}

impl GraphEngine for LocalGraphEngine {
    fn submit_sync(&self, packets: PacketMap) -> Result<PacketMap, GraphError> {
        let timestamp = self.shared.check_inputs(&packets)?;
        self.shared.record_timestamp(timestamp)?;

        tracing::debug!(
            "Graph {}: sync submission at {:?}",
            self.shared.config.graph_name,
            timestamp
        );
        self.shared.run(packets, timestamp)
    }

    fn submit_async(&self, packets: PacketMap) -> Result<bool, GraphError> {
        // Held across the checks so a concurrent close() is seen as Closed.
        let jobs = self.jobs.lock();
        let timestamp = self.shared.check_inputs(&packets)?;

        let Some(jobs) = jobs.as_ref() else {
            if self.shared.closed.load(Ordering::Acquire) {
                return Err(GraphError::Closed);
            }
            return Err(GraphError::WorkerUnavailable(
                "engine was created without a completion callback".to_string(),
            ));
        };

        let limiting = self.shared.config.enable_flow_limiting;
        if limiting
            && self
                .shared
                .in_flight
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            tracing::debug!(
                "Graph {}: refusing submission at {:?}, previous frame still in flight",
                self.shared.config.graph_name,
                timestamp
            );
            return Ok(false);
        }

        let release = |e: GraphError| {
            if limiting {
                self.shared.in_flight.store(false, Ordering::Release);
            }
            e
        };

        self.shared.record_timestamp(timestamp).map_err(release)?;

        jobs.send((packets, timestamp))
            .map_err(|e| release(GraphError::WorkerUnavailable(e.to_string())))?;

        tracing::debug!(
            "Graph {}: async submission accepted at {:?}",
            self.shared.config.graph_name,
            timestamp
        );
        Ok(true)
    }

    fn close(&self) -> Result<(), GraphError> {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        // Dropping the sender lets the worker drain queued jobs and exit.
        self.jobs.lock().take();

        let worker = self.worker.lock().take();
        if let Some(handle) = worker {
            if handle.thread().id() == thread::current().id() {
                tracing::debug!("Graph engine closed from its own worker; not joining");
            } else if handle.join().is_err() {
                return Err(GraphError::WorkerUnavailable(
                    "worker thread panicked".to_string(),
                ));
            }
        }

        tracing::info!("LocalGraphEngine for graph {} closed", self.shared.config.graph_name);
        Ok(())
    }
}

impl Drop for LocalGraphEngine {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Error closing graph engine: {}", e);
        }
    }
}

/// Factory producing `LocalGraphEngine`s that share one calculator
#[derive(Clone)]
pub struct LocalEngineFactory {
    calculator: Arc<dyn Calculator>,
}

impl LocalEngineFactory {
    pub fn new(calculator: impl Calculator + 'static) -> Self {
        Self {
            calculator: Arc::new(calculator),
        }
    }

    pub fn from_arc(calculator: Arc<dyn Calculator>) -> Self {
        Self { calculator }
    }
}

impl GraphEngineFactory for LocalEngineFactory {
    fn create(
        &self,
        config: TaskGraphConfig,
        callback: Option<PacketsCallback>,
    ) -> Result<Box<dyn GraphEngine>, GraphError> {
        let engine = LocalGraphEngine::new(config, Arc::clone(&self.calculator), callback)?;
        Ok(Box::new(engine))
    }
}
