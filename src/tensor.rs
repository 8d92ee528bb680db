//! Tensor storage used throughout the crate.
//!
//! Activations are laid out as NCHW. Deconvolution weights are laid out as
//! (in_channels, out_channels, kernel_h, kernel_w).

use ndarray::ArrayD;

/// Dense `f32` tensor of arbitrary rank.
pub type Tensor = ArrayD<f32>;
