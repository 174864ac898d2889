use crate::id::TaskId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("task title cannot be empty")]
    EmptyTitle,
}

/// Recoverable failure of a store mutation. The snapshot is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("task not found: {0}")]
    NotFound(TaskId),
}

/// Storage failures. These are logged and absorbed by the persistence bridge.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to read key {key}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write key {key}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode tasks")]
    Encode(#[source] serde_json::Error),
    #[error("stored payload is not valid JSON")]
    Decode(#[source] serde_json::Error),
    #[error("stored payload is not an array")]
    NotAnArray,
}
