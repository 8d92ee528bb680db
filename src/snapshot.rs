//! Parameter snapshots
//!
//! A [`LayerSnapshot`] captures the values of every initialized parameter of
//! a layer so they can be written to disk as JSON and restored later.
//!
//! ```json
//! {
//!   "params": [
//!     { "name": "W", "shape": [3, 7, 4, 4], "data": [0.01, -0.2, ...] },
//!     { "name": "b", "shape": [7], "data": [0.0, 0.0, ...] }
//!   ]
//! }
//! ```

use crate::error::Result;
use crate::parameter::Parameter;
use crate::tensor::Tensor;
use ndarray::IxDyn;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Values of a single parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl ParameterSnapshot {
    /// Capture `param`, or `None` if its shape is still pending.
    pub fn capture(param: &Parameter) -> Option<Self> {
        param.data().map(|data| Self {
            name: param.name().to_string(),
            shape: data.shape().to_vec(),
            data: data.iter().cloned().collect(),
        })
    }

    /// Rebuild the tensor; fails if `data` does not fill `shape`.
    pub fn to_tensor(&self) -> Result<Tensor> {
        Ok(Tensor::from_shape_vec(
            IxDyn(&self.shape),
            self.data.clone(),
        )?)
    }
}

/// Values of every initialized parameter of a layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerSnapshot {
    pub params: Vec<ParameterSnapshot>,
}

impl LayerSnapshot {
    pub fn get(&self, name: &str) -> Option<&ParameterSnapshot> {
        self.params.iter().find(|param| param.name == name)
    }

    /// Write the snapshot as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a snapshot previously written by [`LayerSnapshot::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
