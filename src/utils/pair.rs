//! Two-dimensional (height, width) values.
//!
//! Kernel sizes, strides and paddings may be given either as a single scalar
//! applied to both axes or as an explicit pair. Both forms normalize to the
//! same [`Pair`].

use serde::Deserialize;
use std::fmt;

/// A (height, width) pair of spatial sizes.
///
/// # Example
///
/// ```
/// use deconv_layers::utils::Pair;
///
/// assert_eq!(Pair::from(2), Pair::from((2, 2)));
/// assert_eq!(Pair::from([3, 5]), Pair::new(3, 5));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "PairRepr")]
pub struct Pair {
    pub h: usize,
    pub w: usize,
}

impl Pair {
    pub const fn new(h: usize, w: usize) -> Self {
        Self { h, w }
    }

    /// The same value on both axes.
    pub const fn square(value: usize) -> Self {
        Self { h: value, w: value }
    }

    /// Product of both axes (e.g. number of kernel taps).
    pub fn area(&self) -> usize {
        self.h * self.w
    }

    pub fn as_tuple(&self) -> (usize, usize) {
        (self.h, self.w)
    }
}

impl From<usize> for Pair {
    fn from(value: usize) -> Self {
        Pair::square(value)
    }
}

impl From<(usize, usize)> for Pair {
    fn from((h, w): (usize, usize)) -> Self {
        Pair::new(h, w)
    }
}

impl From<[usize; 2]> for Pair {
    fn from([h, w]: [usize; 2]) -> Self {
        Pair::new(h, w)
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.h, self.w)
    }
}

// JSON accepts `2` as well as `[2, 3]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PairRepr {
    Scalar(usize),
    Pair([usize; 2]),
}

impl From<PairRepr> for Pair {
    fn from(repr: PairRepr) -> Self {
        match repr {
            PairRepr::Scalar(value) => Pair::from(value),
            PairRepr::Pair(values) => Pair::from(values),
        }
    }
}
