//! Task runner: execution-mode gated access to a graph engine

use std::sync::Arc;

use crate::graph::{GraphEngine, GraphEngineFactory, PacketsCallback, TaskGraphConfig};
use crate::packet::PacketMap;
use crate::task::ExecutionMode;
use crate::{Error, Result};

/// Drives one configured graph under a fixed execution mode
///
/// TaskRunner owns the engine handle and exposes exactly three submission
/// operations, one per mode. Calling the operation of another mode fails
/// with `Error::PreconditionFailed` before anything reaches the engine.
///
/// # Architecture
///
/// ```text
/// Task ──packets──▶ TaskRunner ──mode check──▶ GraphEngine
///                      │                           │
///                      │ Image / Video: blocking   │ LiveStream: callback
///                      ◀────────── PacketMap ──────┘
/// ```
///
/// # Flow limiting
///
/// In `LiveStream` mode the runner enables flow limiting in the graph
/// config, so the engine refuses a new submission while the previous one
/// is still running. Synchronous modes leave it off: the blocking call is
/// the backpressure.
///
/// # Thread Safety
///
/// TaskRunner is Arc-wrapped internally and clones are cheap.
pub struct TaskRunner {
    inner: Arc<TaskRunnerInner>,
}

struct TaskRunnerInner {
    mode: ExecutionMode,
    config: TaskGraphConfig,
    engine: Box<dyn GraphEngine>,
}

impl TaskRunner {
    /// Create a runner and its engine
    ///
    /// # Arguments
    ///
    /// * `config` - Graph descriptor; its flow-limiting flag is overridden
    ///   according to `mode`
    /// * `mode` - Execution mode, immutable afterwards
    /// * `callback` - Completion callback, required for `LiveStream` and
    ///   rejected otherwise
    /// * `factory` - Builds the engine
    ///
    /// # Errors
    ///
    /// * `Error::InvalidArgument` - callback presence does not match `mode`
    /// * `Error::EngineExecution` - the engine could not be created
    pub fn new(
        config: TaskGraphConfig,
        mode: ExecutionMode,
        callback: Option<PacketsCallback>,
        factory: &dyn GraphEngineFactory,
    ) -> Result<Self> {
        match (mode, callback.is_some()) {
            (ExecutionMode::LiveStream, false) => {
                return Err(Error::InvalidArgument(
                    "Live stream mode requires a result callback".to_string(),
                ));
            }
            (ExecutionMode::Image | ExecutionMode::Video, true) => {
                return Err(Error::InvalidArgument(format!(
                    "A result callback must not be provided in {} mode",
                    mode
                )));
            }
            _ => {}
        }

        let config = config.with_flow_limiting(mode == ExecutionMode::LiveStream);
        let engine = factory.create(config.clone(), callback)?;

        tracing::info!(
            "TaskRunner created for graph {} in {} mode",
            config.graph_name,
            mode
        );

        Ok(Self {
            inner: Arc::new(TaskRunnerInner {
                mode,
                config,
                engine,
            }),
        })
    }

    /// Execution mode fixed at construction
    pub fn mode(&self) -> ExecutionMode {
        self.inner.mode
    }

    /// Graph config the engine was created with (flow-limiting flag applied)
    pub fn graph_config(&self) -> &TaskGraphConfig {
        &self.inner.config
    }

    /// Fail with `PreconditionFailed` unless the runner is in `expected` mode
    ///
    /// Tasks call this before marshaling packets so that a wrong-mode call
    /// costs nothing.
    pub fn ensure_mode(&self, expected: ExecutionMode) -> Result<()> {
        if self.inner.mode == expected {
            return Ok(());
        }
        Err(Error::PreconditionFailed(format!(
            "The task is not initialized with the {} mode. Current running mode: {}",
            expected, self.inner.mode
        )))
    }

    /// Run an unstamped packet map and block for its output (Image mode)
    pub fn process_once(&self, packets: PacketMap) -> Result<PacketMap> {
        self.ensure_mode(ExecutionMode::Image)?;
        Ok(self.inner.engine.submit_sync(packets)?)
    }

    /// Run a stamped packet map and block for its output (Video mode)
    ///
    /// Timestamps must not decrease across calls; the engine may reject
    /// packets that violate this.
    pub fn process_stream(&self, packets: PacketMap) -> Result<PacketMap> {
        self.ensure_mode(ExecutionMode::Video)?;
        Ok(self.inner.engine.submit_sync(packets)?)
    }

    /// Hand a stamped packet map to the engine without waiting (LiveStream mode)
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - accepted; the result arrives through the callback
    /// * `Ok(false)` - refused under flow limiting
    /// * `Err(Error)` - wrong mode, or the engine rejected the packets
    pub fn process_async(&self, packets: PacketMap) -> Result<bool> {
        self.ensure_mode(ExecutionMode::LiveStream)?;
        let accepted = self.inner.engine.submit_async(packets)?;
        if !accepted {
            tracing::debug!(
                "Graph {} refused a live-stream submission under flow limiting",
                self.inner.config.graph_name
            );
        }
        Ok(accepted)
    }

    /// Shut the engine down; later submissions fail
    pub fn close(&self) -> Result<()> {
        self.inner.engine.close()?;
        Ok(())
    }
}

impl Clone for TaskRunner {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
