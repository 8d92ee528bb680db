//! Shared utilities for layer implementations.

pub mod pair;

pub use pair::Pair;
