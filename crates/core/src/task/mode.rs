//! Execution modes

use std::fmt;

use serde::{Deserialize, Serialize};

/// Execution discipline of a task, fixed at construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Independent single images, no timestamps
    #[default]
    Image,
    /// Decoded video frames with increasing timestamps, blocking calls
    Video,
    /// Live frames submitted asynchronously, results delivered by callback
    LiveStream,
}

impl ExecutionMode {
    /// Whether results arrive through a callback rather than return values
    pub fn is_async(&self) -> bool {
        matches!(self, ExecutionMode::LiveStream)
    }

    /// Whether submissions carry timestamps
    pub fn is_stamped(&self) -> bool {
        !matches!(self, ExecutionMode::Image)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionMode::Image => "image",
            ExecutionMode::Video => "video",
            ExecutionMode::LiveStream => "live stream",
        };
        f.write_str(name)
    }
}
