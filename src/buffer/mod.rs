pub mod error;
pub mod queue;

pub use error::BufferError;
pub use queue::{BoundedQueue, MAX_CAPACITY, QueueMetrics};
