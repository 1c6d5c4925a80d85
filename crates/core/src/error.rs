//! Error types for vision-tasks-core

use thiserror::Error;

use crate::graph::GraphError;

/// Result type alias for vision-tasks-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Task-level error types
///
/// Synchronous operations surface these directly. Live-stream execution
/// failures reach the client only through the result delegate.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad image, geometry or option input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation called under the wrong execution mode
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Packet, queue or engine resources could not be created
    #[error("Resource creation failed: {0}")]
    ResourceCreation(String),

    /// The graph engine reported a failure while processing
    #[error("Graph engine execution failed: {0}")]
    EngineExecution(#[from] GraphError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// True for errors raised because the caller used the wrong execution mode
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, Error::PreconditionFailed(_))
    }
}
