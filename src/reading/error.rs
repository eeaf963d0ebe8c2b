use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseReadingError {
    #[error("unexpected field count: expected {expected}, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    #[error("invalid field at index {index}: {value:?}")]
    InvalidField { index: usize, value: String },
}
