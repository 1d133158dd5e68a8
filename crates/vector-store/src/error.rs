use crate::types::SlotId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    #[error("Index is empty")]
    EmptyIndex,

    #[error("Slot {0} is referenced by the vector index but missing from the record store")]
    NotFound(SlotId),

    #[error("Slot {0} is already present in the record store")]
    DuplicateSlot(SlotId),

    #[error("Embedding error at segment {segment}: {message}")]
    Embedding { segment: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt index artifacts: {0}")]
    Corrupt(String),

    #[error("{0}")]
    Other(String),
}

impl VectorStoreError {
    pub fn embedding(segment: usize, message: impl Into<String>) -> Self {
        Self::Embedding {
            segment,
            message: message.into(),
        }
    }

    pub fn invalid_vector(message: impl Into<String>) -> Self {
        Self::InvalidVector(message.into())
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt(message.into())
    }

    /// True for failures raised while reading or writing the on-disk artifacts.
    #[must_use]
    pub const fn is_persistence(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Serialization(_) | Self::Corrupt(_))
    }
}
