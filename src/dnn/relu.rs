use crate::dnn::layer::Operation;
use crate::PgdFloat;
use ndarray::{Array1, ArrayView1, Zip};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ReLU {
    ndims: usize,
}

impl ReLU {
    pub const fn new(ndims: usize) -> Self {
        Self { ndims }
    }
}

impl Display for ReLU {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "ReLU")
    }
}

impl Operation for ReLU {
    fn input_dims(&self) -> Option<usize> {
        Some(self.ndims)
    }

    fn forward1(&self, input: &ArrayView1<PgdFloat>) -> Array1<PgdFloat> {
        input.mapv(|x| if x.lt(&0.) { 0. } else { x })
    }

    /// The subgradient at zero is taken to be zero
    fn backward1(
        &self,
        input: &ArrayView1<PgdFloat>,
        grad_output: &ArrayView1<PgdFloat>,
    ) -> Array1<PgdFloat> {
        Zip::from(input)
            .and(grad_output)
            .map_collect(|&x, &g| if x > 0. { g } else { 0. })
    }
}
