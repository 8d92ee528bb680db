//! 2D transposed convolution (deconvolution) layer implementation
//!
//! This module provides a Deconvolution2DLayer that holds a filter weight and
//! an optional bias vector, and delegates the actual computation to a
//! [`DeconvolutionOp`]. It is commonly used for upsampling in decoders and
//! generative models.

use crate::error::{Error, Result};
use crate::initializers::{Fans, Initializer};
use crate::layers::Layer;
use crate::ops::{DeconvParams, Deconvolution2D, DeconvolutionOp};
use crate::parameter::Parameter;
use crate::snapshot::{LayerSnapshot, ParameterSnapshot};
use crate::tensor::Tensor;
use crate::utils::Pair;
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Optional settings for [`Deconvolution2DLayer`].
///
/// Scalar arguments to the builder methods apply to both axes:
/// `stride(2)` and `stride((2, 2))` are equivalent.
///
/// # Example
///
/// ```
/// use deconv_layers::layers::Deconvolution2DOptions;
///
/// let options = Deconvolution2DOptions::default()
///     .stride(2)
///     .pad(1)
///     .nobias(true)
///     .seed(42);
/// assert_eq!(options.stride.as_tuple(), (2, 2));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Deconvolution2DOptions {
    pub stride: Pair,
    pub pad: Pair,
    /// Build the layer without a bias parameter.
    pub nobias: bool,
    /// Expected output (height, width). `None` axes are inferred from the input.
    pub outsize: (Option<usize>, Option<usize>),
    /// Weight initializer; defaults to [`Initializer::default_weight`].
    pub initial_w: Option<Initializer>,
    /// Bias initializer; defaults to constant zero.
    pub initial_bias: Option<Initializer>,
    /// Ask the operator for a deterministic algorithm.
    pub deterministic: bool,
    /// Seed for parameter initialization. Drawn from the OS when absent.
    ///
    /// The bias is drawn before the weight, so an eager layer and a lazy one
    /// sharing a seed end up with the same parameters.
    pub seed: Option<u64>,
}

impl Default for Deconvolution2DOptions {
    fn default() -> Self {
        Self {
            stride: Pair::square(1),
            pad: Pair::square(0),
            nobias: false,
            outsize: (None, None),
            initial_w: None,
            initial_bias: None,
            deterministic: false,
            seed: None,
        }
    }
}

impl Deconvolution2DOptions {
    pub fn stride(mut self, stride: impl Into<Pair>) -> Self {
        self.stride = stride.into();
        self
    }

    pub fn pad(mut self, pad: impl Into<Pair>) -> Self {
        self.pad = pad.into();
        self
    }

    pub fn nobias(mut self, nobias: bool) -> Self {
        self.nobias = nobias;
        self
    }

    pub fn outsize(mut self, height: Option<usize>, width: Option<usize>) -> Self {
        self.outsize = (height, width);
        self
    }

    pub fn initial_w(mut self, initializer: Initializer) -> Self {
        self.initial_w = Some(initializer);
        self
    }

    pub fn initial_bias(mut self, initializer: Initializer) -> Self {
        self.initial_bias = Some(initializer);
        self
    }

    pub fn deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Two-dimensional deconvolution layer.
///
/// The filter weight has shape `(in_channels, out_channels, kh, kw)` and the
/// bias has shape `(out_channels,)`. When the input channel count is not
/// given at construction, the weight stays uninitialized until the first
/// forward pass, where it is read from axis 1 of the input.
///
/// By default the weight is drawn from a zero-mean Gaussian with standard
/// deviation `sqrt(1 / (in_channels * kh * kw))` and the bias is zero.
///
/// # Example
///
/// ```
/// use deconv_layers::layers::{Deconvolution2DLayer, Deconvolution2DOptions, Layer};
/// use deconv_layers::Tensor;
/// use ndarray::IxDyn;
///
/// let options = Deconvolution2DOptions::default().stride(2).pad(1);
/// let mut layer = Deconvolution2DLayer::lazy(7, 4, options).unwrap();
/// assert_eq!(layer.in_channels(), None);
///
/// let x = Tensor::zeros(IxDyn(&[1, 3, 10, 10]));
/// let y = layer.forward(&x).unwrap();
/// assert_eq!(y.shape(), &[1, 7, 20, 20]);
/// assert_eq!(layer.in_channels(), Some(3));
/// ```
#[derive(Debug)]
pub struct Deconvolution2DLayer<O = Deconvolution2D> {
    in_channels: Option<usize>,
    out_channels: usize,
    ksize: Pair,
    stride: Pair,
    pad: Pair,
    outsize: (Option<usize>, Option<usize>),
    deterministic: bool,
    weight: Parameter,
    bias: Option<Parameter>,
    rng: StdRng,
    op: O,
}

impl Deconvolution2DLayer<Deconvolution2D> {
    /// Create a layer whose input channel count is known.
    ///
    /// The weight is initialized immediately.
    ///
    /// # Errors
    ///
    /// * `InvalidConfig` if a precomputed bias array does not have shape
    ///   `(out_channels,)` or an initializer cannot be applied.
    /// * `ShapeMismatch` if a precomputed weight array has the wrong shape.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        ksize: impl Into<Pair>,
        options: Deconvolution2DOptions,
    ) -> Result<Self> {
        Self::build(Some(in_channels), out_channels, ksize.into(), options)
    }

    /// Create a layer that infers its input channel count on first use.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if a precomputed bias array does not have shape
    /// `(out_channels,)` or the bias initializer cannot be applied.
    pub fn lazy(
        out_channels: usize,
        ksize: impl Into<Pair>,
        options: Deconvolution2DOptions,
    ) -> Result<Self> {
        Self::build(None, out_channels, ksize.into(), options)
    }

    fn build(
        in_channels: Option<usize>,
        out_channels: usize,
        ksize: Pair,
        options: Deconvolution2DOptions,
    ) -> Result<Self> {
        let bias_init = if options.nobias {
            None
        } else {
            let init = options.initial_bias.unwrap_or_else(Initializer::default_bias);
            if let Initializer::Array(values) = &init {
                if values.shape() != &[out_channels][..] {
                    return Err(Error::InvalidConfig(format!(
                        "initial bias must have shape [{}], got {:?}",
                        out_channels,
                        values.shape()
                    )));
                }
            }
            Some(init)
        };

        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let weight_init = options.initial_w.unwrap_or_else(Initializer::default_weight);

        let mut layer = Self {
            in_channels: None,
            out_channels,
            ksize,
            stride: options.stride,
            pad: options.pad,
            outsize: options.outsize,
            deterministic: options.deterministic,
            weight: Parameter::uninitialized("W", weight_init),
            bias: None,
            rng,
            op: Deconvolution2D,
        };

        // Bias first: a lazy layer draws the weight after it, on first use.
        if let Some(init) = bias_init {
            let mut bias = Parameter::uninitialized("b", init);
            bias.initialize(&[out_channels], None, &mut layer.rng)?;
            layer.bias = Some(bias);
        }

        if let Some(in_channels) = in_channels {
            layer.initialize_params(in_channels)?;
        }

        Ok(layer)
    }
}

impl<O: DeconvolutionOp> Deconvolution2DLayer<O> {
    /// Replace the operator used by [`Layer::forward`].
    pub fn with_operator<P: DeconvolutionOp>(self, op: P) -> Deconvolution2DLayer<P> {
        Deconvolution2DLayer {
            in_channels: self.in_channels,
            out_channels: self.out_channels,
            ksize: self.ksize,
            stride: self.stride,
            pad: self.pad,
            outsize: self.outsize,
            deterministic: self.deterministic,
            weight: self.weight,
            bias: self.bias,
            rng: self.rng,
            op,
        }
    }

    /// Get the number of input channels, if already known.
    pub fn in_channels(&self) -> Option<usize> {
        self.in_channels
    }

    /// Get the number of output channels.
    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Get the kernel size.
    pub fn ksize(&self) -> Pair {
        self.ksize
    }

    /// Get the stride.
    pub fn stride(&self) -> Pair {
        self.stride
    }

    /// Get the padding amount.
    pub fn pad(&self) -> Pair {
        self.pad
    }

    /// Get the requested output size; `None` axes are inferred.
    pub fn outsize(&self) -> (Option<usize>, Option<usize>) {
        self.outsize
    }

    pub fn is_deterministic(&self) -> bool {
        self.deterministic
    }

    pub fn weight(&self) -> &Parameter {
        &self.weight
    }

    /// The bias parameter, or `None` for a layer built with `nobias`.
    pub fn bias(&self) -> Option<&Parameter> {
        self.bias.as_ref()
    }

    pub fn operator(&self) -> &O {
        &self.op
    }

    /// Configuration handed to the operator on every call.
    pub fn deconv_params(&self) -> DeconvParams {
        DeconvParams {
            stride: self.stride,
            pad: self.pad,
            outsize: self.outsize,
            deterministic: self.deterministic,
        }
    }

    fn initialize_params(&mut self, in_channels: usize) -> Result<()> {
        let (kh, kw) = self.ksize.as_tuple();
        let shape = [in_channels, self.out_channels, kh, kw];
        let fans = Fans::new(
            in_channels * self.ksize.area(),
            self.out_channels * self.ksize.area(),
        );

        self.weight.initialize(&shape, Some(fans), &mut self.rng)?;
        self.in_channels = Some(in_channels);

        debug!(
            "Deconvolution2D: initialized W with shape {:?} using {}",
            shape,
            self.weight.initializer().name()
        );
        Ok(())
    }

    /// Capture the values of every initialized parameter.
    pub fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot {
            params: self
                .parameters()
                .into_iter()
                .filter_map(ParameterSnapshot::capture)
                .collect(),
        }
    }

    /// Load parameter values from `snapshot`.
    ///
    /// A weight in the snapshot fixes the input channel count of a layer that
    /// has not seen any input yet. Nothing is modified if validation fails.
    ///
    /// # Errors
    ///
    /// * `ShapeMismatch` if the weight disagrees with the layer geometry or
    ///   an already known input channel count, or the bias has the wrong
    ///   length.
    /// * `InvalidConfig` if the snapshot holds an unknown parameter, a bias
    ///   the layer does not have, or lacks the bias the layer has.
    pub fn restore(&mut self, snapshot: &LayerSnapshot) -> Result<()> {
        if let Some(unknown) = snapshot
            .params
            .iter()
            .find(|param| param.name != "W" && param.name != "b")
        {
            return Err(Error::InvalidConfig(format!(
                "snapshot holds unknown parameter `{}`",
                unknown.name
            )));
        }

        let weight = snapshot.get("W").map(|w| w.to_tensor()).transpose()?;
        if let Some(w) = &weight {
            let shape = w.shape();
            let geometry_ok = shape.len() == 4
                && shape[1] == self.out_channels
                && shape[2] == self.ksize.h
                && shape[3] == self.ksize.w;
            let channels_ok = self.in_channels.map_or(true, |c| shape.len() == 4 && shape[0] == c);
            if !geometry_ok || !channels_ok {
                return Err(Error::ShapeMismatch(format!(
                    "snapshot weight has shape {:?}, layer expects ({:?}, {}, {}, {})",
                    shape, self.in_channels, self.out_channels, self.ksize.h, self.ksize.w
                )));
            }
        }

        let bias = snapshot.get("b").map(|b| b.to_tensor()).transpose()?;
        match (&self.bias, &bias) {
            (None, Some(_)) => {
                return Err(Error::InvalidConfig(
                    "snapshot holds a bias but the layer has none".to_string(),
                ))
            }
            (Some(_), None) => {
                return Err(Error::InvalidConfig(
                    "snapshot is missing the bias".to_string(),
                ))
            }
            (Some(_), Some(b)) if b.shape() != &[self.out_channels][..] => {
                return Err(Error::ShapeMismatch(format!(
                    "snapshot bias has shape {:?}, layer expects [{}]",
                    b.shape(),
                    self.out_channels
                )))
            }
            _ => {}
        }

        if let Some(w) = weight {
            let in_channels = w.shape()[0];
            self.weight.set_data(w)?;
            self.in_channels = Some(in_channels);
        }
        if let (Some(param), Some(b)) = (self.bias.as_mut(), bias) {
            param.set_data(b)?;
        }

        debug!(
            "Deconvolution2D: restored {} parameter(s)",
            snapshot.params.len()
        );
        Ok(())
    }
}

impl<O: DeconvolutionOp> Layer for Deconvolution2DLayer<O> {
    fn forward(&mut self, x: &Tensor) -> Result<Tensor> {
        if !self.weight.is_initialized() {
            let in_channels = x.shape().get(1).copied().ok_or_else(|| {
                Error::ShapeMismatch(format!(
                    "cannot infer input channels from shape {:?}",
                    x.shape()
                ))
            })?;
            self.initialize_params(in_channels)?;
        }

        let params = self.deconv_params();
        let w = self.weight.try_data()?;
        let b = match &self.bias {
            Some(bias) => Some(bias.try_data()?),
            None => None,
        };
        self.op.deconvolve(x, w, b, &params)
    }

    fn parameters(&self) -> Vec<&Parameter> {
        let mut params = vec![&self.weight];
        if let Some(bias) = &self.bias {
            params.push(bias);
        }
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        let mut params = vec![&mut self.weight];
        if let Some(bias) = self.bias.as_mut() {
            params.push(bias);
        }
        params
    }
}
