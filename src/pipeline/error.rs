use crate::buffer::BufferError;
use crate::stats::StatsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),
    #[error("Stats error: {0}")]
    Stats(#[from] StatsError),
    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to spawn {thread} thread: {source}")]
    Spawn {
        thread: String,
        #[source]
        source: std::io::Error,
    },
}
