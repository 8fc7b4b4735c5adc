//! Bounded-concurrency task engine: FIFO queue, at most N units in flight.

pub mod handle;
pub mod pool;

pub use handle::TaskHandle;
pub use pool::{EngineConfig, TaskEngine};
