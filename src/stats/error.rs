use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    #[error("Histogram bucket width must be greater than 0")]
    InvalidBucketWidth,
    #[error("Histogram must have at least one bucket (got {0})")]
    InvalidBucketCount(usize),
}
