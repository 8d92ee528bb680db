//! Parameter initialization strategies
//!
//! An [`Initializer`] fills a freshly allocated parameter tensor in place.
//! Fan-scaled strategies (He, Glorot, LeCun) need to know how many inputs and
//! outputs feed one unit, which the owning layer supplies as [`Fans`] because
//! only the layer knows how its weight axes map to inputs and outputs.
//!
//! Initializers can also be described in JSON configuration files:
//!
//! ```json
//! { "type": "he_normal", "scale": 0.7071 }
//! ```

use crate::error::{Error, Result};
use crate::tensor::Tensor;
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
use rand::distributions::Uniform;
use rand::Rng;
use serde::Deserialize;

/// Number of input and output connections of one unit of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fans {
    pub fan_in: usize,
    pub fan_out: usize,
}

impl Fans {
    pub fn new(fan_in: usize, fan_out: usize) -> Self {
        Self { fan_in, fan_out }
    }
}

/// Strategy used to fill a parameter tensor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Initializer {
    /// Every element set to `value`.
    Constant { value: f32 },
    Zero,
    One,
    /// Gaussian with zero mean and standard deviation `scale`.
    Normal {
        #[serde(default = "default_plain_scale")]
        scale: f32,
    },
    /// Uniform on `[-scale, scale)`.
    Uniform {
        #[serde(default = "default_plain_scale")]
        scale: f32,
    },
    /// Gaussian with std `scale * sqrt(2 / fan_in)`.
    HeNormal {
        #[serde(default = "default_fan_scale")]
        scale: f32,
    },
    /// Uniform with bound `scale * sqrt(6 / fan_in)`.
    HeUniform {
        #[serde(default = "default_fan_scale")]
        scale: f32,
    },
    /// Gaussian with std `scale * sqrt(2 / (fan_in + fan_out))`.
    GlorotNormal {
        #[serde(default = "default_fan_scale")]
        scale: f32,
    },
    /// Uniform with bound `scale * sqrt(6 / (fan_in + fan_out))`.
    GlorotUniform {
        #[serde(default = "default_fan_scale")]
        scale: f32,
    },
    /// Gaussian with std `scale * sqrt(1 / fan_in)`.
    #[serde(rename = "lecun_normal")]
    LeCunNormal {
        #[serde(default = "default_fan_scale")]
        scale: f32,
    },
    /// Precomputed values copied verbatim. The target shape must match.
    #[serde(skip)]
    Array(Tensor),
}

fn default_plain_scale() -> f32 {
    0.05
}

fn default_fan_scale() -> f32 {
    1.0
}

impl Initializer {
    /// Default weight initializer: He normal scaled by `1/sqrt(2)`, which
    /// gives a standard deviation of `sqrt(1 / fan_in)`.
    pub fn default_weight() -> Self {
        Initializer::HeNormal {
            scale: std::f32::consts::FRAC_1_SQRT_2,
        }
    }

    /// Default bias initializer: constant zero.
    pub fn default_bias() -> Self {
        Initializer::Constant { value: 0.0 }
    }

    /// Short name used in log and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Initializer::Constant { .. } => "constant",
            Initializer::Zero => "zero",
            Initializer::One => "one",
            Initializer::Normal { .. } => "normal",
            Initializer::Uniform { .. } => "uniform",
            Initializer::HeNormal { .. } => "he_normal",
            Initializer::HeUniform { .. } => "he_uniform",
            Initializer::GlorotNormal { .. } => "glorot_normal",
            Initializer::GlorotUniform { .. } => "glorot_uniform",
            Initializer::LeCunNormal { .. } => "lecun_normal",
            Initializer::Array(_) => "array",
        }
    }

    /// Whether this strategy needs [`Fans`] to produce values.
    pub fn needs_fans(&self) -> bool {
        matches!(
            self,
            Initializer::HeNormal { .. }
                | Initializer::HeUniform { .. }
                | Initializer::GlorotNormal { .. }
                | Initializer::GlorotUniform { .. }
                | Initializer::LeCunNormal { .. }
        )
    }

    /// Fill `target` in place.
    ///
    /// # Errors
    ///
    /// * `InvalidConfig` if a scale is not positive, or a fan-scaled
    ///   strategy is used without `fans` (or with a zero fan-in).
    /// * `ShapeMismatch` if an [`Initializer::Array`] has a different shape
    ///   than `target`.
    pub fn fill<R: Rng + ?Sized>(
        &self,
        target: &mut Tensor,
        fans: Option<Fans>,
        rng: &mut R,
    ) -> Result<()> {
        match self {
            Initializer::Constant { value } => target.fill(*value),
            Initializer::Zero => target.fill(0.0),
            Initializer::One => target.fill(1.0),
            Initializer::Normal { scale } => {
                let std = checked_scale(self, *scale)?;
                fill_normal(target, std, rng)?;
            }
            Initializer::Uniform { scale } => {
                let bound = checked_scale(self, *scale)?;
                fill_uniform(target, bound, rng);
            }
            Initializer::HeNormal { scale } => {
                let fans = required_fans(self, fans)?;
                let std = checked_scale(self, *scale)? * (2.0 / fans.fan_in as f32).sqrt();
                fill_normal(target, std, rng)?;
            }
            Initializer::HeUniform { scale } => {
                let fans = required_fans(self, fans)?;
                let bound = checked_scale(self, *scale)? * (6.0 / fans.fan_in as f32).sqrt();
                fill_uniform(target, bound, rng);
            }
            Initializer::GlorotNormal { scale } => {
                let fans = required_fans(self, fans)?;
                let fan_sum = (fans.fan_in + fans.fan_out) as f32;
                let std = checked_scale(self, *scale)? * (2.0 / fan_sum).sqrt();
                fill_normal(target, std, rng)?;
            }
            Initializer::GlorotUniform { scale } => {
                let fans = required_fans(self, fans)?;
                let fan_sum = (fans.fan_in + fans.fan_out) as f32;
                let bound = checked_scale(self, *scale)? * (6.0 / fan_sum).sqrt();
                fill_uniform(target, bound, rng);
            }
            Initializer::LeCunNormal { scale } => {
                let fans = required_fans(self, fans)?;
                let std = checked_scale(self, *scale)? * (1.0 / fans.fan_in as f32).sqrt();
                fill_normal(target, std, rng)?;
            }
            Initializer::Array(values) => {
                if values.shape() != target.shape() {
                    return Err(Error::ShapeMismatch(format!(
                        "initial array has shape {:?}, parameter expects {:?}",
                        values.shape(),
                        target.shape()
                    )));
                }
                target.assign(values);
            }
        }
        Ok(())
    }
}

fn checked_scale(init: &Initializer, scale: f32) -> Result<f32> {
    if scale.is_finite() && scale > 0.0 {
        Ok(scale)
    } else {
        Err(Error::InvalidConfig(format!(
            "{} initializer scale must be positive, got {}",
            init.name(),
            scale
        )))
    }
}

fn required_fans(init: &Initializer, fans: Option<Fans>) -> Result<Fans> {
    match fans {
        Some(fans) if fans.fan_in > 0 => Ok(fans),
        Some(_) => Err(Error::InvalidConfig(format!(
            "{} initializer needs a non-zero fan-in",
            init.name()
        ))),
        None => Err(Error::InvalidConfig(format!(
            "{} initializer cannot be used for a parameter without fan information",
            init.name()
        ))),
    }
}

fn fill_normal<R: Rng + ?Sized>(target: &mut Tensor, std: f32, rng: &mut R) -> Result<()> {
    let dist = Normal::new(0.0, std)
        .map_err(|err| Error::InvalidConfig(format!("normal distribution: {}", err)))?;
    let values = Tensor::random_using(target.raw_dim(), dist, rng);
    target.assign(&values);
    Ok(())
}

fn fill_uniform<R: Rng + ?Sized>(target: &mut Tensor, bound: f32, rng: &mut R) {
    let values = Tensor::random_using(target.raw_dim(), Uniform::new(-bound, bound), rng);
    target.assign(&values);
}
