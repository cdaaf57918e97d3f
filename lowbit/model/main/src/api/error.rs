//! Error types for model operations

use thiserror::Error;

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while building, persisting or running a model
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Hub error: {0}")]
    HubError(#[from] lowbit_hub::HubError),

    #[error("Quantization error: {0}")]
    QuantError(#[from] lowbit_quant::QuantError),

    #[error("SafeTensors error: {0}")]
    SafeTensorsError(#[from] safetensors::SafeTensorError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing tensor: {0}")]
    MissingTensor(String),

    #[error("Shape mismatch for {name}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Generation error: {0}")]
    GenerationError(String),
}
