use crate::dnn::{Conv, Dense, Dropout, LogSoftmax, MaxPool, ReLU};
use crate::error::Result;
use crate::PgdFloat;
use enum_dispatch::enum_dispatch;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display};

/// Operations may not be stateful. I.e., they must deterministically produce identical outputs from identical inputs.
/// All data is flattened; operations that care about spatial structure carry their own input shape.
#[enum_dispatch]
pub trait Operation: Clone + Debug + Display {
    /// Flattened input length the operation requires, `None` if it accepts any length
    fn input_dims(&self) -> Option<usize> {
        None
    }

    /// Flattened output length for an input of length `input_dims`
    fn output_dims(&self, input_dims: usize) -> usize {
        input_dims
    }

    fn forward1(&self, input: &ArrayView1<PgdFloat>) -> Array1<PgdFloat>;

    /// Vector-Jacobian product: the gradient with respect to the operation's input,
    /// given the gradient with respect to its output, evaluated at `input`.
    fn backward1(
        &self,
        input: &ArrayView1<PgdFloat>,
        grad_output: &ArrayView1<PgdFloat>,
    ) -> Array1<PgdFloat>;

    /// Checks internal consistency of the parameters, e.g. after deserialization
    ///
    /// # Errors
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

#[enum_dispatch(Operation)]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum Layer {
    Dense,
    Conv,
    MaxPool,
    ReLU,
    Dropout,
    LogSoftmax,
}

impl Layer {
    pub fn new_dense(dense: Dense) -> Self {
        Self::Dense(dense)
    }

    pub fn new_relu(ndims: usize) -> Self {
        Self::ReLU(ReLU::new(ndims))
    }
}

impl Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Dense(op) => Display::fmt(op, f),
            Self::Conv(op) => Display::fmt(op, f),
            Self::MaxPool(op) => Display::fmt(op, f),
            Self::ReLU(op) => Display::fmt(op, f),
            Self::Dropout(op) => Display::fmt(op, f),
            Self::LogSoftmax(op) => Display::fmt(op, f),
        }
    }
}
