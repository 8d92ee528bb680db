//! Tensor operators consumed by layers.
//!
//! Layers never compute on their own; they hand their parameters and
//! configuration to an operator through the [`DeconvolutionOp`] trait.
//! [`Deconvolution2D`] is the CPU implementation used by default.

pub mod deconv2d;

pub use deconv2d::{deconvolution_2d, get_conv_outsize, get_deconv_outsize, Deconvolution2D};

use crate::error::Result;
use crate::tensor::Tensor;
use crate::utils::Pair;

/// Configuration passed to a deconvolution operator alongside the tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeconvParams {
    pub stride: Pair,
    pub pad: Pair,
    /// Requested output (height, width); `None` infers that axis.
    pub outsize: (Option<usize>, Option<usize>),
    /// Forces the sequential code path when `true`.
    pub deterministic: bool,
}

/// A transposed convolution implementation.
pub trait DeconvolutionOp {
    /// Compute the deconvolution of `x` (N, C, H, W) with weight `w`
    /// (C, O, kh, kw) and optional bias `b` (O).
    fn deconvolve(
        &self,
        x: &Tensor,
        w: &Tensor,
        b: Option<&Tensor>,
        params: &DeconvParams,
    ) -> Result<Tensor>;
}
