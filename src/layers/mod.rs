//! Layer abstractions for neural networks
//!
//! This module provides the Layer trait and the deconvolution layer built
//! on top of it.

mod r#trait;
pub mod deconv2d;

// Re-export the Layer trait for convenience
pub use deconv2d::{Deconvolution2DLayer, Deconvolution2DOptions};
pub use r#trait::Layer;
