#![allow(clippy::module_name_repetitions)]
//! 2-D convolution over flattened `[height, width, channels]` data
use crate::dnn::layer::Operation;
use crate::error::{PgdError, Result};
use crate::tensorshape::TensorShape;
use crate::PgdFloat;
use itertools::Itertools;
use ndarray::{Array1, Array4, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Assumes that data is always in a flattened state.
/// Weights are of the shape: (`kernel_h`, `kernel_w`, `channels_in`, `channels_out`)
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Conv {
    kernel: Array4<PgdFloat>,                  // (K_h, K_w, C_in, C_out) following tf convention
    bias: Array1<PgdFloat>,                    // (C_out)
    input_shape: TensorShape,                  // (H, W, C_in)
    strides: (usize, usize),                   // (y, x)
    padding: ((usize, usize), (usize, usize)), // ((top, bottom), (left, right))
}

impl Conv {
    pub fn new(
        kernel: Array4<PgdFloat>,
        bias: Array1<PgdFloat>,
        input_shape: TensorShape,
        strides: (usize, usize),
        padding: ((usize, usize), (usize, usize)),
    ) -> Self {
        debug_assert_eq!(kernel.shape()[3], bias.len());
        Self {
            kernel,
            bias,
            input_shape,
            strides,
            padding,
        }
    }

    /// # Panics
    /// If the input shape is not an image shape
    pub fn output_shape(&self) -> TensorShape {
        let (h_in, w_in, _) = self.input_shape.as_hwc().unwrap();
        let k_h = self.kernel.shape()[0];
        let k_w = self.kernel.shape()[1];
        let h_out = (h_in + self.padding.0 .0 + self.padding.0 .1 - (k_h - 1) - 1) / self.strides.0 + 1;
        let w_out = (w_in + self.padding.1 .0 + self.padding.1 .1 - (k_w - 1) - 1) / self.strides.1 + 1;

        TensorShape::image(h_out, w_out, self.kernel.shape()[3])
    }

    /// Visits every (output index, input index, kernel weight) triple of the convolution.
    /// Positions falling in the zero padding are skipped.
    fn for_each_tap<F: FnMut(usize, usize, PgdFloat)>(&self, mut f: F) {
        let (h_in, w_in, c_in) = self.input_shape.as_hwc().unwrap();
        let out = self.output_shape();
        let (h_out, w_out, c_out) = (out[0], out[1], out[2]);
        let k_h = self.kernel.shape()[0];
        let k_w = self.kernel.shape()[1];

        for (y_out, x_out) in (0..h_out).cartesian_product(0..w_out) {
            let y_0 = y_out * self.strides.0;
            let x_0 = x_out * self.strides.1;

            for k_y in 0..k_h {
                if y_0 + k_y < self.padding.0 .0 || y_0 + k_y >= h_in + self.padding.0 .0 {
                    continue;
                }
                let y_in = y_0 + k_y - self.padding.0 .0;
                for k_x in 0..k_w {
                    if x_0 + k_x < self.padding.1 .0 || x_0 + k_x >= w_in + self.padding.1 .0 {
                        continue;
                    }
                    let x_in = x_0 + k_x - self.padding.1 .0;

                    for f_in in 0..c_in {
                        let input_idx = y_in * (w_in * c_in) + x_in * c_in + f_in;
                        for f_out in 0..c_out {
                            let output_idx = y_out * (w_out * c_out) + x_out * c_out + f_out;
                            f(output_idx, input_idx, self.kernel[[k_y, k_x, f_in, f_out]]);
                        }
                    }
                }
            }
        }
    }

    fn bias_per_output(&self) -> Array1<PgdFloat> {
        let out = self.output_shape();
        let c_out = out[2];
        Array1::from_shape_fn(out.dims(), |idx| self.bias[idx % c_out])
    }
}

impl Operation for Conv {
    fn input_dims(&self) -> Option<usize> {
        Some(self.input_shape.dims())
    }

    fn output_dims(&self, _input_dims: usize) -> usize {
        self.output_shape().dims()
    }

    fn forward1(&self, input: &ArrayView1<PgdFloat>) -> Array1<PgdFloat> {
        debug_assert_eq!(input.len(), self.input_shape.dims());
        let mut output = self.bias_per_output();
        self.for_each_tap(|output_idx, input_idx, w| {
            output[output_idx] += input[input_idx] * w;
        });
        output
    }

    fn backward1(
        &self,
        input: &ArrayView1<PgdFloat>,
        grad_output: &ArrayView1<PgdFloat>,
    ) -> Array1<PgdFloat> {
        let mut grad_input = Array1::zeros(input.len());
        self.for_each_tap(|output_idx, input_idx, w| {
            grad_input[input_idx] += grad_output[output_idx] * w;
        });
        grad_input
    }

    fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PgdError::InvalidNetwork(format!("conv: {}", msg)));
        let (h_in, w_in, c_in) = match self.input_shape.as_hwc() {
            Some(hwc) => hwc,
            None => return invalid(format!("input shape {} is not an image", self.input_shape)),
        };
        let shape = self.kernel.shape();
        if shape[3] != self.bias.len() {
            return invalid(format!("{} filters but {} biases", shape[3], self.bias.len()));
        }
        if shape[2] != c_in {
            return invalid(format!("kernel expects {} channels, input has {}", shape[2], c_in));
        }
        if self.strides.0 == 0 || self.strides.1 == 0 {
            return invalid("zero stride".to_string());
        }
        if shape[0] == 0
            || shape[1] == 0
            || h_in + self.padding.0 .0 + self.padding.0 .1 < shape[0]
            || w_in + self.padding.1 .0 + self.padding.1 .1 < shape[1]
        {
            return invalid(format!(
                "kernel {}x{} does not fit input {}",
                shape[0], shape[1], self.input_shape
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Conv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Conv {}x{}, {}",
            self.kernel.shape()[1],
            self.kernel.shape()[0],
            self.kernel.shape()[3]
        )
    }
}
