//! Configuration structures for deconvolution layers
//!
//! This module parses layer configurations from JSON files so layer geometry
//! and initialization can be changed without code changes.

use crate::error::{Error, Result};
use crate::initializers::Initializer;
use crate::layers::{Deconvolution2DLayer, Deconvolution2DOptions};
use crate::utils::Pair;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;

/// Configuration for a single Deconvolution2D layer.
///
/// Size-like fields accept either a scalar applied to both axes or a
/// `[height, width]` pair. Omitting `in_channels` defers weight
/// initialization until the first forward pass.
///
/// # Example
///
/// ```json
/// {
///   "out_channels": 7,
///   "ksize": 4,
///   "stride": [2, 2],
///   "pad": 1,
///   "outsize": [null, 20],
///   "initial_w": { "type": "he_normal", "scale": 0.7071 },
///   "deterministic": true,
///   "seed": 42
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Deconvolution2DConfig {
    /// Number of input channels; inferred on first use when absent
    pub in_channels: Option<usize>,

    /// Number of output channels
    pub out_channels: usize,

    /// Kernel size
    pub ksize: Pair,

    /// Stride (default: 1)
    #[serde(default = "default_stride")]
    pub stride: Pair,

    /// Zero-padding (default: 0)
    #[serde(default)]
    pub pad: Pair,

    /// Drop the bias parameter
    #[serde(default)]
    pub nobias: bool,

    /// Expected output (height, width); `null` entries are inferred and a
    /// plain `null` infers both
    #[serde(default, deserialize_with = "deserialize_outsize")]
    pub outsize: (Option<usize>, Option<usize>),

    /// Weight initializer (default: He normal scaled by 1/sqrt(2))
    pub initial_w: Option<Initializer>,

    /// Bias initializer (default: constant 0)
    pub initial_bias: Option<Initializer>,

    /// Request a deterministic algorithm from the operator
    #[serde(default)]
    pub deterministic: bool,

    /// Seed for parameter initialization
    pub seed: Option<u64>,
}

fn default_stride() -> Pair {
    Pair::square(1)
}

fn deserialize_outsize<'de, D>(
    deserializer: D,
) -> std::result::Result<(Option<usize>, Option<usize>), D::Error>
where
    D: Deserializer<'de>,
{
    let outsize = Option::<(Option<usize>, Option<usize>)>::deserialize(deserializer)?;
    Ok(outsize.unwrap_or((None, None)))
}

impl Deconvolution2DConfig {
    /// Parses and validates a configuration from a JSON string.
    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Deconvolution2DConfig = serde_json::from_str(contents)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Layer options described by this configuration.
    pub fn options(&self) -> Deconvolution2DOptions {
        Deconvolution2DOptions {
            stride: self.stride,
            pad: self.pad,
            nobias: self.nobias,
            outsize: self.outsize,
            initial_w: self.initial_w.clone(),
            initial_bias: self.initial_bias.clone(),
            deterministic: self.deterministic,
            seed: self.seed,
        }
    }

    /// Builds the layer, eagerly or lazily depending on `in_channels`.
    pub fn build_layer(&self) -> Result<Deconvolution2DLayer> {
        match self.in_channels {
            Some(in_channels) => {
                Deconvolution2DLayer::new(in_channels, self.out_channels, self.ksize, self.options())
            }
            None => Deconvolution2DLayer::lazy(self.out_channels, self.ksize, self.options()),
        }
    }
}

/// Loads a layer configuration from a JSON file.
///
/// Reads the file at `path` and deserializes its JSON contents into a
/// `Deconvolution2DConfig`, then validates it.
///
/// # Returns
///
/// `Ok(Deconvolution2DConfig)` on success, or an error if the file cannot be
/// read, the JSON is invalid, or a value is out of range.
///
/// # Examples
///
/// ```no_run
/// use deconv_layers::config::load_config;
///
/// let cfg = load_config("config/upsample_2x.json").unwrap();
/// let layer = cfg.build_layer().unwrap();
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<Deconvolution2DConfig> {
    let contents = fs::read_to_string(path)?;
    Deconvolution2DConfig::from_json(&contents)
}

fn validate_config(config: &Deconvolution2DConfig) -> Result<()> {
    if config.out_channels == 0 {
        return Err(Error::InvalidConfig(
            "out_channels must be positive".to_string(),
        ));
    }

    if config.in_channels == Some(0) {
        return Err(Error::InvalidConfig(
            "in_channels must be positive when given".to_string(),
        ));
    }

    if config.ksize.h == 0 || config.ksize.w == 0 {
        return Err(Error::InvalidConfig(format!(
            "ksize must be positive, got {}",
            config.ksize
        )));
    }

    if config.stride.h == 0 || config.stride.w == 0 {
        return Err(Error::InvalidConfig(format!(
            "stride must be positive, got {}",
            config.stride
        )));
    }

    if config.outsize.0 == Some(0) || config.outsize.1 == Some(0) {
        return Err(Error::InvalidConfig(
            "outsize entries must be positive".to_string(),
        ));
    }

    Ok(())
}
