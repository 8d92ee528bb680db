//! Two-dimensional transposed convolution on the CPU
//!
//! The output is computed in two steps per batch item:
//!
//! 1. `col = W^T · x`, where `W` is viewed as `(C, O * kh * kw)` and `x` as
//!    `(C, H * W)`. Each column of `col` holds the contribution of one input
//!    pixel to a full `O x kh x kw` output patch.
//! 2. `col2im` scatters and accumulates every patch into the output image at
//!    `(iy * stride - pad + ky, ix * stride - pad + kx)`, dropping anything
//!    that falls outside the output.
//!
//! Output spatial size defaults to `stride * (in - 1) + k - 2 * pad` per axis.

use super::{DeconvParams, DeconvolutionOp};
use crate::error::{Error, Result};
use crate::tensor::Tensor;
use log::trace;
use ndarray::{Array4, ArrayView2, ArrayViewMut3, Axis, Ix1, Ix4, Zip};

/// Reference CPU deconvolution operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deconvolution2D;

impl DeconvolutionOp for Deconvolution2D {
    fn deconvolve(
        &self,
        x: &Tensor,
        w: &Tensor,
        b: Option<&Tensor>,
        params: &DeconvParams,
    ) -> Result<Tensor> {
        deconvolution_2d(x, w, b, params)
    }
}

/// Spatial geometry shared by every batch item.
#[derive(Debug, Clone, Copy)]
struct Geometry {
    in_h: usize,
    in_w: usize,
    kh: usize,
    kw: usize,
    sy: usize,
    sx: usize,
    ph: usize,
    pw: usize,
    out_h: usize,
    out_w: usize,
}

/// Transposed convolution of `x` (N, C, H, W) with `w` (C, O, kh, kw).
///
/// Returns a tensor of shape (N, O, out_h, out_w). `b`, when given, must be
/// a vector of length O and is added to every output pixel of its channel.
///
/// # Errors
///
/// * `ShapeMismatch` if `x` or `w` is not rank 4, the channel axes disagree,
///   the bias has the wrong shape, or an output size hint cannot be produced
///   from the input size.
/// * `InvalidConfig` if a stride is zero or the computed output is empty.
pub fn deconvolution_2d(
    x: &Tensor,
    w: &Tensor,
    b: Option<&Tensor>,
    params: &DeconvParams,
) -> Result<Tensor> {
    let x4 = x.view().into_dimensionality::<Ix4>().map_err(|_| {
        Error::ShapeMismatch(format!(
            "input must have rank 4 (N, C, H, W), got shape {:?}",
            x.shape()
        ))
    })?;
    let w4 = w.view().into_dimensionality::<Ix4>().map_err(|_| {
        Error::ShapeMismatch(format!(
            "weight must have rank 4 (C, O, kh, kw), got shape {:?}",
            w.shape()
        ))
    })?;

    let (batch, channels, in_h, in_w) = x4.dim();
    let (w_channels, out_channels, kh, kw) = w4.dim();

    if channels != w_channels {
        return Err(Error::ShapeMismatch(format!(
            "input has {} channels but weight expects {}",
            channels, w_channels
        )));
    }

    if let Some(b) = b {
        if b.ndim() != 1 || b.len() != out_channels {
            return Err(Error::ShapeMismatch(format!(
                "bias must have shape [{}], got {:?}",
                out_channels,
                b.shape()
            )));
        }
    }

    let (sy, sx) = params.stride.as_tuple();
    let (ph, pw) = params.pad.as_tuple();
    if sy == 0 || sx == 0 {
        return Err(Error::InvalidConfig(format!(
            "stride must be positive, got {}",
            params.stride
        )));
    }

    let out_h = resolve_outsize(in_h, kh, sy, ph, params.outsize.0, "height")?;
    let out_w = resolve_outsize(in_w, kw, sx, pw, params.outsize.1, "width")?;

    trace!(
        "deconvolution_2d: x={:?} w={:?} stride={} pad={} -> ({}, {}, {}, {})",
        x.shape(),
        w.shape(),
        params.stride,
        params.pad,
        batch,
        out_channels,
        out_h,
        out_w
    );

    let geometry = Geometry {
        in_h,
        in_w,
        kh,
        kw,
        sy,
        sx,
        ph,
        pw,
        out_h,
        out_w,
    };

    // Standard layout so the reshapes below read elements in logical order.
    let x_std = x4.as_standard_layout();
    let x_cols = x_std.view().into_shape((batch, channels, in_h * in_w))?;
    let w_std = w4.as_standard_layout();
    let w_mat = w_std.view().into_shape((channels, out_channels * kh * kw))?;
    let bias = b
        .map(|b| b.view().into_dimensionality::<Ix1>())
        .transpose()?;

    let mut y = Array4::<f32>::zeros((batch, out_channels, out_h, out_w));

    let body = |mut y_b: ArrayViewMut3<f32>, x_b: ArrayView2<f32>| {
        let col = w_mat.t().dot(&x_b);
        col2im(col.view(), &mut y_b, &geometry);
        if let Some(bias) = &bias {
            for (mut plane, &value) in y_b.outer_iter_mut().zip(bias.iter()) {
                plane += value;
            }
        }
    };

    let zip = Zip::from(y.axis_iter_mut(Axis(0))).and(x_cols.axis_iter(Axis(0)));
    if params.deterministic || batch < 2 {
        zip.for_each(body);
    } else {
        zip.par_for_each(body);
    }

    Ok(y.into_dyn())
}

// col: (O * kh * kw, H * W), y: (O, out_h, out_w)
fn col2im(col: ArrayView2<f32>, y: &mut ArrayViewMut3<f32>, g: &Geometry) {
    let out_channels = y.len_of(Axis(0));

    for oc in 0..out_channels {
        for ky in 0..g.kh {
            for kx in 0..g.kw {
                let row = col.row((oc * g.kh + ky) * g.kw + kx);

                for iy in 0..g.in_h {
                    let oy = (iy * g.sy + ky) as isize - g.ph as isize;
                    if oy < 0 || oy >= g.out_h as isize {
                        continue;
                    }

                    for ix in 0..g.in_w {
                        let ox = (ix * g.sx + kx) as isize - g.pw as isize;
                        if ox < 0 || ox >= g.out_w as isize {
                            continue;
                        }
                        y[[oc, oy as usize, ox as usize]] += row[iy * g.in_w + ix];
                    }
                }
            }
        }
    }
}

fn resolve_outsize(
    in_size: usize,
    ksize: usize,
    stride: usize,
    pad: usize,
    hint: Option<usize>,
    axis: &str,
) -> Result<usize> {
    match hint {
        None => get_deconv_outsize(in_size, ksize, stride, pad).ok_or_else(|| {
            Error::InvalidConfig(format!(
                "{} output size is not positive (in={}, k={}, stride={}, pad={})",
                axis, in_size, ksize, stride, pad
            ))
        }),
        Some(out) => {
            let lower = get_conv_outsize(out, ksize, stride, pad, false);
            let upper = get_conv_outsize(out, ksize, stride, pad, true);
            let in_size = in_size as isize;
            match (lower, upper) {
                (Some(lo), Some(hi)) if out > 0 && lo <= in_size && in_size <= hi => {
                    Ok(out)
                }
                _ => Err(Error::ShapeMismatch(format!(
                    "{} output size {} cannot be produced from input size {} (k={}, stride={}, pad={})",
                    axis, out, in_size, ksize, stride, pad
                ))),
            }
        }
    }
}

/// Output size of a transposed convolution along one axis.
///
/// Returns `None` when the result would be zero or negative.
pub fn get_deconv_outsize(size: usize, ksize: usize, stride: usize, pad: usize) -> Option<usize> {
    if size == 0 {
        return None;
    }
    let out = (stride * (size - 1) + ksize) as isize - 2 * pad as isize;
    if out > 0 {
        Some(out as usize)
    } else {
        None
    }
}

/// Output size of the forward convolution along one axis.
///
/// With `cover_all` the last partial window is counted as well. The division
/// rounds toward negative infinity, so a padded input smaller than the kernel
/// yields zero or a negative size. Returns `None` only for a zero stride.
pub fn get_conv_outsize(
    size: usize,
    ksize: usize,
    stride: usize,
    pad: usize,
    cover_all: bool,
) -> Option<isize> {
    if stride == 0 {
        return None;
    }
    let stride = stride as isize;
    let span = (size + 2 * pad) as isize - ksize as isize;
    let span = if cover_all { span + stride - 1 } else { span };
    Some(span.div_euclid(stride) + 1)
}
