use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Invalid buffer capacity: {0} (must be between 1 and {max})", max = super::queue::MAX_CAPACITY)]
    InvalidCapacity(usize),
}
