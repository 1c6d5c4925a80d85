//! Vision Tasks Core - task runner for timestamped vision graphs
//!
//! This crate converts client requests into packet maps, submits them to a
//! graph engine under one of three execution modes, and routes the results
//! back to the caller.
//!
//! # Architecture
//!
//! ```text
//! client ──▶ task (packet map builder) ──▶ TaskRunner ──▶ GraphEngine
//!                                             │              │
//!                  Image / Video: return value ◀─────────────┤
//!                  LiveStream: callback ──▶ DeliveryQueue ──▶ delegate
//! ```
//!
//! - `packet`: timestamped packets and packet maps
//! - `frame` / `geometry`: image payloads and region normalization
//! - `graph`: engine interface plus `LocalGraphEngine`
//! - `task`: `ExecutionMode`, `TaskRunner`, `DeliveryQueue`
//!
//! Concrete tasks (e.g. the face detector) live in their own crates and
//! build on these pieces.
//!
//! # Example
//!
//! ```ignore
//! use vision_tasks_core::graph::{LocalEngineFactory, TaskGraphConfig};
//! use vision_tasks_core::task::{ExecutionMode, TaskRunner};
//!
//! let factory = LocalEngineFactory::new(MyCalculator);
//! let runner = TaskRunner::new(config, ExecutionMode::Image, None, &factory)?;
//! let outputs = runner.process_once(packets)?;
//! ```

#![warn(clippy::all)]

pub mod containers;
pub mod frame;
pub mod geometry;
pub mod graph;
pub mod packet;
pub mod task;

mod error;
pub use error::{Error, Result};

pub use containers::{BoundingBox, Category, Detection, DetectionResult, NormalizedKeypoint};
pub use frame::{ImageFormat, ImageFrame, ImageOrientation};
pub use geometry::{DefaultRegionNormalizer, NormalizedRect, Rect, RegionNormalizer};
pub use packet::{Packet, PacketMap, Payload, Timestamp, UNSET_TIMESTAMP_MS};
pub use task::{ExecutionMode, TaskRunner};

/// Initialize logging for vision tasks
///
/// Installs a `tracing` fmt subscriber filtered by `RUST_LOG` (default
/// `info`). Calling it again, or after another subscriber was installed,
/// is a no-op.
pub fn init() -> Result<()> {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Vision tasks core initialized");
    }
    Ok(())
}
