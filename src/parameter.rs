//! Learnable parameters with deferred shape binding
//!
//! A [`Parameter`] is created before its shape is necessarily known. Until
//! [`Parameter::initialize`] runs it holds no data, and [`Parameter::is_initialized`]
//! reports `false`. The initializer it was created with is kept so the
//! values can be produced whenever the shape becomes available.

use crate::error::{Error, Result};
use crate::initializers::{Fans, Initializer};
use crate::tensor::Tensor;
use ndarray::IxDyn;
use rand::Rng;

/// A named, owned tensor whose values are learned during training.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    data: Option<Tensor>,
    initializer: Initializer,
}

impl Parameter {
    /// Create a parameter whose shape is not yet known.
    pub fn uninitialized(name: impl Into<String>, initializer: Initializer) -> Self {
        Self {
            name: name.into(),
            data: None,
            initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initializer(&self) -> &Initializer {
        &self.initializer
    }

    pub fn is_initialized(&self) -> bool {
        self.data.is_some()
    }

    /// Allocate `shape` and fill it with the parameter's initializer.
    ///
    /// Any previous data is replaced. Nothing is modified if the
    /// initializer fails.
    pub fn initialize<R: Rng + ?Sized>(
        &mut self,
        shape: &[usize],
        fans: Option<Fans>,
        rng: &mut R,
    ) -> Result<()> {
        let mut data = Tensor::zeros(IxDyn(shape));
        self.initializer.fill(&mut data, fans, rng)?;
        self.data = Some(data);
        Ok(())
    }

    /// Current values, or `None` while the shape is pending.
    pub fn data(&self) -> Option<&Tensor> {
        self.data.as_ref()
    }

    /// Mutable access for in-place updates (e.g. by an optimizer).
    pub fn data_mut(&mut self) -> Option<&mut Tensor> {
        self.data.as_mut()
    }

    /// Values, failing with [`Error::Uninitialized`] while the shape is pending.
    pub fn try_data(&self) -> Result<&Tensor> {
        self.data
            .as_ref()
            .ok_or_else(|| Error::Uninitialized(self.name.clone()))
    }

    pub fn shape(&self) -> Option<&[usize]> {
        self.data.as_ref().map(|data| data.shape())
    }

    /// Number of scalar values held (0 while uninitialized).
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, |data| data.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the values, binding the shape if it was still pending.
    ///
    /// An already initialized parameter only accepts values of its own shape.
    pub fn set_data(&mut self, values: Tensor) -> Result<()> {
        if let Some(current) = self.data.as_mut() {
            if current.shape() != values.shape() {
                return Err(Error::ShapeMismatch(format!(
                    "parameter `{}` has shape {:?}, got {:?}",
                    self.name,
                    current.shape(),
                    values.shape()
                )));
            }
            current.assign(&values);
            return Ok(());
        }
        self.data = Some(values);
        Ok(())
    }
}
