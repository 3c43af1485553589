//! Representation of affine transformations
use crate::AdvFloat;
use ndarray::{Array, Array1, Array2, ArrayView1, ArrayView2, Dimension, Ix2};
use serde::{Deserialize, Serialize};
use std::ops::Mul;

pub type Affine2 = Affine<Ix2>;

/// Affine map data structure
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Affine<D: Dimension> {
    basis: Array<AdvFloat, D>,
    shift: Array1<AdvFloat>,
}

/// Assumes that the affine is f(x) = Ax + b
impl Affine2 {
    /// # Panics
    /// If improper shapes are passed in
    pub fn new(basis: Array2<AdvFloat>, shift: Array1<AdvFloat>) -> Self {
        debug_assert_eq!(basis.shape()[0], shift.len());
        Self { basis, shift }
    }

    pub fn basis(&self) -> ArrayView2<AdvFloat> {
        self.basis.view()
    }

    pub fn input_dim(&self) -> usize {
        self.basis.shape()[1]
    }

    pub fn output_dim(&self) -> usize {
        self.shift.len()
    }

    pub fn apply(&self, x: &ArrayView1<AdvFloat>) -> Array1<AdvFloat> {
        self.basis.dot(x) + &self.shift
    }

    /// Pulls a cotangent on the output back to the input: `Aᵀ v`
    pub fn vjp(&self, v: &ArrayView1<AdvFloat>) -> Array1<AdvFloat> {
        self.basis.t().dot(v)
    }
}

/// Scale Affine by scalar
impl<D: Dimension> Mul<AdvFloat> for Affine<D> {
    type Output = Self;

    fn mul(self, rhs: AdvFloat) -> Self {
        Self {
            basis: &self.basis * rhs,
            shift: &self.shift * rhs,
        }
    }
}
