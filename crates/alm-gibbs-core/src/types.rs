//! Type aliases and common types.

use nalgebra::{DMatrix, DVector};

/// Dense real matrix (response blocks, Gram matrix).
pub type Matrix = DMatrix<f64>;

/// Dense real vector (coefficients, precisions, visibility components).
pub type Vector = DVector<f64>;
