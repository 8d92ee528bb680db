//! Deconvolution layers
//!
//! This library provides a two-dimensional transposed convolution layer that
//! owns its filter weight and optional bias, binds the weight shape lazily
//! when the input channel count is not known up front, and delegates the
//! arithmetic to a pluggable operator.
//!
//! # Modules
//!
//! - `layers`: Layer trait and the Deconvolution2D layer
//! - `ops`: Operator trait and the CPU deconvolution implementation
//! - `initializers`: Parameter initialization strategies
//! - `parameter`: Parameters with deferred shape binding
//! - `snapshot`: Saving and restoring parameter values
//! - `config`: JSON layer configuration
//! - `utils`: Shared utilities (height/width pairs)

pub mod config;
pub mod error;
pub mod initializers;
pub mod layers;
pub mod ops;
pub mod parameter;
pub mod snapshot;
pub mod tensor;
pub mod utils;

pub use error::{Error, Result};
pub use tensor::Tensor;
