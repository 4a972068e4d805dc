use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid positional name: {0}")]
    InvalidName(String),

    #[error("invalid collection id: {0}")]
    InvalidCollection(String),

    #[error("invalid sequence: {0}")]
    InvalidSequence(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
