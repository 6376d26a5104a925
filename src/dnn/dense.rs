use crate::affine::Affine2;
use crate::dnn::layer::Operation;
use crate::error::{PgdError, Result};
use crate::PgdFloat;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Dense {
    aff: Affine2,
}

impl Dense {
    pub const fn new(aff: Affine2) -> Self {
        Self { aff }
    }

    pub fn from_parts(mul: Array2<PgdFloat>, add: Array1<PgdFloat>) -> Self {
        Self {
            aff: Affine2::new(mul, add),
        }
    }
}

impl Operation for Dense {
    fn input_dims(&self) -> Option<usize> {
        Some(self.aff.input_dim())
    }

    fn output_dims(&self, _input_dims: usize) -> usize {
        self.aff.output_dim()
    }

    fn forward1(&self, input: &ArrayView1<PgdFloat>) -> Array1<PgdFloat> {
        debug_assert_eq!(input.len(), self.aff.input_dim());
        self.aff.apply(input)
    }

    fn backward1(
        &self,
        _input: &ArrayView1<PgdFloat>,
        grad_output: &ArrayView1<PgdFloat>,
    ) -> Array1<PgdFloat> {
        self.aff.pullback(grad_output)
    }

    fn validate(&self) -> Result<()> {
        if self.aff.is_well_formed() {
            Ok(())
        } else {
            Err(PgdError::InvalidNetwork(format!(
                "dense layer has {} rows but {} biases",
                self.aff.basis().nrows(),
                self.aff.output_dim()
            )))
        }
    }
}

impl fmt::Display for Dense {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Dense {}", self.aff.output_dim())
    }
}
