//! Graph engine interface
//!
//! The task runner never executes computation itself. It configures a
//! `GraphEngine` once from a `TaskGraphConfig` and hands it packet maps:
//!
//! ```text
//! TaskRunner ──submit_sync──▶ GraphEngine ──▶ PacketMap
//!            ──submit_async─▶ GraphEngine ──callback(Result<PacketMap>)──▶ adapter
//! ```
//!
//! `LocalGraphEngine` is an in-process implementation driven by a
//! `Calculator`; other engines plug in through `GraphEngineFactory`.

mod local;

pub use local::{Calculator, LocalEngineFactory, LocalGraphEngine};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::packet::{PacketMap, Timestamp};

/// Engine-level failures
///
/// Converted into `Error::EngineExecution` at the task boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// A configured input stream received no packet
    #[error("Missing packet for input stream '{0}'")]
    MissingInput(String),

    /// A packet was addressed to a stream the graph does not declare
    #[error("Unknown input stream '{0}'")]
    UnknownInput(String),

    /// Packets submitted together carry different timestamps
    #[error("Packets in one submission disagree on timestamp: {0}")]
    TimestampMismatch(String),

    /// Timestamp went backwards relative to a previous submission
    #[error("Input timestamp {current} precedes previous timestamp {previous}")]
    NonMonotonicTimestamp {
        /// Last accepted timestamp
        previous: Timestamp,
        /// Rejected timestamp
        current: Timestamp,
    },

    /// An output packet that must be stamped arrived without a timestamp
    #[error("Output stream '{0}' carries no timestamp")]
    UnstampedOutput(String),

    /// A calculator node failed
    #[error("Calculator '{node}' failed: {message}")]
    CalculatorFailed {
        /// Node name
        node: String,
        /// Failure description
        message: String,
    },

    /// The engine has been closed
    #[error("Graph engine is closed")]
    Closed,

    /// Worker thread could not be reached or started
    #[error("Graph engine worker unavailable: {0}")]
    WorkerUnavailable(String),
}

/// A `TAG:name` stream binding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamBinding {
    /// Tag the graph uses to identify the port (e.g. `IMAGE`)
    pub tag: String,
    /// Stream name packets are keyed by (e.g. `image_in`)
    pub name: String,
}

impl StreamBinding {
    pub fn new(tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for StreamBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tag, self.name)
    }
}

impl FromStr for StreamBinding {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.split_once(':') {
            Some((tag, name)) if !tag.is_empty() && !name.is_empty() => {
                Ok(StreamBinding::new(tag, name))
            }
            _ => Err(crate::Error::InvalidArgument(format!(
                "Stream binding '{}' must have the form TAG:name",
                s
            ))),
        }
    }
}

/// Immutable graph descriptor handed to the engine at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskGraphConfig {
    /// Fully qualified graph name
    pub graph_name: String,
    /// Tagged input streams
    pub input_streams: Vec<StreamBinding>,
    /// Tagged output streams
    pub output_streams: Vec<StreamBinding>,
    /// Task-specific options, serialized by the task
    pub task_options: serde_json::Value,
    /// Refuse new async submissions while one is in flight
    pub enable_flow_limiting: bool,
}

impl TaskGraphConfig {
    /// Create a config with no streams and flow limiting disabled
    pub fn new(graph_name: impl Into<String>) -> Self {
        Self {
            graph_name: graph_name.into(),
            input_streams: Vec::new(),
            output_streams: Vec::new(),
            task_options: serde_json::Value::Null,
            enable_flow_limiting: false,
        }
    }

    /// Builder pattern: add an input stream
    pub fn with_input(mut self, binding: StreamBinding) -> Self {
        self.input_streams.push(binding);
        self
    }

    /// Builder pattern: add an output stream
    pub fn with_output(mut self, binding: StreamBinding) -> Self {
        self.output_streams.push(binding);
        self
    }

    /// Builder pattern: set task options
    pub fn with_task_options(mut self, options: serde_json::Value) -> Self {
        self.task_options = options;
        self
    }

    /// Builder pattern: toggle flow limiting
    pub fn with_flow_limiting(mut self, enabled: bool) -> Self {
        self.enable_flow_limiting = enabled;
        self
    }

    /// Whether `name` is a declared input stream
    pub fn has_input(&self, name: &str) -> bool {
        self.input_streams.iter().any(|b| b.name == name)
    }

    /// Whether `name` is a declared output stream
    pub fn has_output(&self, name: &str) -> bool {
        self.output_streams.iter().any(|b| b.name == name)
    }
}

/// Completion callback for async submissions
///
/// Invoked once per accepted submission, on an engine-owned thread.
pub type PacketsCallback = Arc<dyn Fn(Result<PacketMap, GraphError>) + Send + Sync>;

/// A configured, running graph
pub trait GraphEngine: Send + Sync {
    /// Run one packet map to completion on the calling thread
    fn submit_sync(&self, packets: PacketMap) -> Result<PacketMap, GraphError>;

    /// Queue one packet map for asynchronous execution
    ///
    /// Returns `Ok(false)` when the submission was refused under flow
    /// limiting. Results of accepted submissions arrive through the
    /// completion callback in submission order.
    fn submit_async(&self, packets: PacketMap) -> Result<bool, GraphError>;

    /// Stop accepting submissions and release engine resources
    fn close(&self) -> Result<(), GraphError>;
}

/// Builds engines from graph configs
pub trait GraphEngineFactory: Send + Sync {
    /// Create an engine for `config`
    ///
    /// `callback` is registered for async completions; it is `None` for
    /// synchronous execution modes.
    fn create(
        &self,
        config: TaskGraphConfig,
        callback: Option<PacketsCallback>,
    ) -> Result<Box<dyn GraphEngine>, GraphError>;
}
