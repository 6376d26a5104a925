use crate::dnn::layer::Operation;
use crate::error::{PgdError, Result};
use crate::tensorshape::TensorShape;
use crate::PgdFloat;
use itertools::Itertools;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-overlapping 2-D max pooling over `[height, width, channels]` data.
///
/// Windows are `pool_size` square with stride `pool_size`; trailing rows and
/// columns that do not fill a window are dropped.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct MaxPool {
    input_shape: TensorShape,
    pool_size: usize,
}

impl MaxPool {
    pub const fn new(input_shape: TensorShape, pool_size: usize) -> Self {
        Self {
            input_shape,
            pool_size,
        }
    }

    /// # Panics
    /// If the input shape is not an image shape
    pub fn output_shape(&self) -> TensorShape {
        let (h_in, w_in, c) = self.input_shape.as_hwc().unwrap();
        TensorShape::image(h_in / self.pool_size, w_in / self.pool_size, c)
    }

    /// Flat input index of the maximum of every output element, first maximum on ties
    fn argmax_indices(&self, input: &ArrayView1<PgdFloat>) -> Vec<usize> {
        let (_, w_in, c) = self.input_shape.as_hwc().unwrap();
        let out = self.output_shape();
        let (h_out, w_out) = (out[0], out[1]);
        let p = self.pool_size;

        (0..h_out)
            .cartesian_product(0..w_out)
            .cartesian_product(0..c)
            .map(|((y_out, x_out), ch)| {
                (0..p)
                    .cartesian_product(0..p)
                    .map(|(k_y, k_x)| {
                        let y_in = y_out * p + k_y;
                        let x_in = x_out * p + k_x;
                        y_in * (w_in * c) + x_in * c + ch
                    })
                    .fold(None, |best: Option<usize>, idx| match best {
                        Some(b) if input[b] >= input[idx] => Some(b),
                        _ => Some(idx),
                    })
                    .unwrap()
            })
            .collect()
    }
}

impl Operation for MaxPool {
    fn input_dims(&self) -> Option<usize> {
        Some(self.input_shape.dims())
    }

    fn output_dims(&self, _input_dims: usize) -> usize {
        self.output_shape().dims()
    }

    fn forward1(&self, input: &ArrayView1<PgdFloat>) -> Array1<PgdFloat> {
        self.argmax_indices(input)
            .into_iter()
            .map(|idx| input[idx])
            .collect()
    }

    fn backward1(
        &self,
        input: &ArrayView1<PgdFloat>,
        grad_output: &ArrayView1<PgdFloat>,
    ) -> Array1<PgdFloat> {
        let mut grad_input = Array1::zeros(input.len());
        for (idx, g) in self.argmax_indices(input).into_iter().zip(grad_output) {
            grad_input[idx] += g;
        }
        grad_input
    }

    fn validate(&self) -> Result<()> {
        match self.input_shape.as_hwc() {
            Some((h, w, c)) if self.pool_size > 0 && h >= self.pool_size && w >= self.pool_size && c > 0 => {
                Ok(())
            }
            _ => Err(PgdError::InvalidNetwork(format!(
                "max pool of size {} over input {}",
                self.pool_size, self.input_shape
            ))),
        }
    }
}

impl fmt::Display for MaxPool {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MaxPool {}x{}", self.pool_size, self.pool_size)
    }
}
