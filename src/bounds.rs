#![allow(clippy::module_name_repetitions)]
use crate::PgdFloat;
use ndarray::iter::Lanes;
use ndarray::{stack, Array2, ArrayView1, Axis, Ix1, Zip};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Elementwise lower and upper bounds on a flattened tensor.
///
/// Row 0 holds the lower bounds and row 1 the upper bounds.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Bounds1 {
    data: Array2<PgdFloat>,
}

impl Bounds1 {
    /// # Panics
    /// If `lower` and `upper` have different lengths
    pub fn new<'a>(lower: ArrayView1<'a, PgdFloat>, upper: ArrayView1<'a, PgdFloat>) -> Self {
        let data = stack(Axis(0), &[lower, upper]).unwrap();
        Self { data }
    }

    /// The feasible set of an L∞ attack: the ball of radius `epsilon` around
    /// `center`, intersected with the valid pixel range.
    pub fn linf_ball(
        center: ArrayView1<PgdFloat>,
        epsilon: PgdFloat,
        range: (PgdFloat, PgdFloat),
    ) -> Self {
        let lower = center.mapv(|x| num::clamp(x - epsilon, range.0, range.1));
        let upper = center.mapv(|x| num::clamp(x + epsilon, range.0, range.1));
        Self::new(lower.view(), upper.view())
    }

    pub fn lower(&self) -> ArrayView1<PgdFloat> {
        self.data.index_axis(Axis(0), 0)
    }

    pub fn upper(&self) -> ArrayView1<PgdFloat> {
        self.data.index_axis(Axis(0), 1)
    }

    pub fn ndim(&self) -> usize {
        self.data.ncols()
    }

    pub fn bounds_iter(&self) -> Lanes<PgdFloat, Ix1> {
        self.data.columns()
    }

    pub fn is_member(&self, x: &ArrayView1<PgdFloat>) -> bool {
        let eps = 1e-9;
        x.len() == self.ndim()
            && Zip::from(x)
                .and(self.bounds_iter())
                .all(|&x, bounds| bounds[0] - eps <= x && x <= bounds[1] + eps)
    }
}

impl Display for Bounds1 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::result::Result<(), std::fmt::Error> {
        write!(f, "Lower: {}\nUpper: {}", self.lower(), self.upper())
    }
}
