//! Layer trait definition for neural network layers
//!
//! This module defines the core Layer trait that parameter-owning layers
//! implement. The trait provides a common interface for forward propagation
//! and parameter access.

use crate::error::Result;
use crate::parameter::Parameter;
use crate::tensor::Tensor;

/// Core trait for neural network layers.
///
/// A layer owns its parameters and forwards call-style invocations to an
/// operator. Layers may bind parameter shapes lazily, which is why
/// [`Layer::forward`] takes `&mut self`.
///
/// # Example
///
/// ```
/// use deconv_layers::layers::{Deconvolution2DLayer, Deconvolution2DOptions, Layer};
/// use deconv_layers::Tensor;
/// use ndarray::IxDyn;
///
/// let mut layer = Deconvolution2DLayer::new(3, 7, 4, Deconvolution2DOptions::default()).unwrap();
/// let x = Tensor::zeros(IxDyn(&[1, 3, 10, 10]));
/// let y = layer.forward(&x).unwrap();
/// assert_eq!(y.shape(), &[1, 7, 13, 13]);
/// ```
pub trait Layer {
    /// Forward propagation through the layer.
    ///
    /// # Errors
    ///
    /// Any error raised while finalizing parameters or by the underlying
    /// operator is returned unchanged.
    fn forward(&mut self, x: &Tensor) -> Result<Tensor>;

    /// Parameters owned by the layer, initialized or not.
    fn parameters(&self) -> Vec<&Parameter>;

    /// Mutable access to the owned parameters, e.g. for an optimizer step.
    fn parameters_mut(&mut self) -> Vec<&mut Parameter>;

    /// Get the number of trainable values in the layer.
    ///
    /// Parameters whose shape is still pending count as zero.
    fn parameter_count(&self) -> usize {
        self.parameters().iter().map(|param| param.len()).sum()
    }
}
