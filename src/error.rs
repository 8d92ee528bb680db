//! Error type shared by layers, operators and configuration loading.

use thiserror::Error;

/// Errors raised while configuring, initializing or running a layer.
#[derive(Debug, Error)]
pub enum Error {
    /// The layer or initializer configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Tensor shapes handed to an operator or parameter do not agree.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A parameter was read before its shape was known.
    #[error("parameter `{0}` is not initialized")]
    Uninitialized(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<ndarray::ShapeError> for Error {
    fn from(err: ndarray::ShapeError) -> Self {
        Error::ShapeMismatch(err.to_string())
    }
}
