//! Task execution: modes, the task runner and result delivery

mod delivery;
mod mode;
mod runner;

pub use delivery::DeliveryQueue;
pub use mode::ExecutionMode;
pub use runner::TaskRunner;
