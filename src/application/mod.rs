//! Application layer: the worker pool and the offline repair pass.

pub mod repair;
pub mod worker;

pub use repair::{RepairReport, RepairTool};
pub use worker::WorkerPool;
