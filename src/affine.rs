#![allow(clippy::module_name_repetitions)]
//! Representation of affine transformations
use crate::PgdFloat;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Affine map data structure, f(x) = Ax + b
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Affine2 {
    basis: Array2<PgdFloat>,
    shift: Array1<PgdFloat>,
}

impl Display for Affine2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::result::Result<(), std::fmt::Error> {
        write!(
            f,
            "Basis {:?} Shift {:?}",
            self.basis.shape(),
            self.shift.shape()
        )
    }
}

impl Affine2 {
    /// # Panics
    /// If improper shapes are passed in
    pub fn new(basis: Array2<PgdFloat>, shift: Array1<PgdFloat>) -> Self {
        debug_assert_eq!(basis.shape()[0], shift.len());
        Self { basis, shift }
    }

    pub fn basis(&self) -> ArrayView2<PgdFloat> {
        self.basis.view()
    }

    pub fn input_dim(&self) -> usize {
        self.basis.shape()[1]
    }

    pub fn output_dim(&self) -> usize {
        self.shift.len()
    }

    pub fn is_well_formed(&self) -> bool {
        self.basis.nrows() == self.shift.len()
    }

    pub fn apply(&self, x: &ArrayView1<PgdFloat>) -> Array1<PgdFloat> {
        self.basis.dot(x) + &self.shift
    }

    /// Pulls a gradient on the output back to the input, i.e. computes `Aᵀg`.
    pub fn pullback(&self, grad_output: &ArrayView1<PgdFloat>) -> Array1<PgdFloat> {
        self.basis.t().dot(grad_output)
    }
}
