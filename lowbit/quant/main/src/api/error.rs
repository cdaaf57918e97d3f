use thiserror::Error;

pub type QuantResult<T> = Result<T, QuantError>;

#[derive(Debug, Error)]
pub enum QuantError {
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },

    #[error("Block alignment error: {0}")]
    BlockAlignment(String),

    #[error("Unsupported quantization type: {0}")]
    UnsupportedQType(String),
}
