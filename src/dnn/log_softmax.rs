use crate::dnn::layer::Operation;
use crate::loss::{log_softmax, softmax};
use crate::PgdFloat;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output layer producing log-probabilities
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct LogSoftmax {}

impl LogSoftmax {
    pub const fn new() -> Self {
        Self {}
    }
}

impl Operation for LogSoftmax {
    fn forward1(&self, input: &ArrayView1<PgdFloat>) -> Array1<PgdFloat> {
        log_softmax(input)
    }

    /// `g - softmax(x) * sum(g)`
    fn backward1(
        &self,
        input: &ArrayView1<PgdFloat>,
        grad_output: &ArrayView1<PgdFloat>,
    ) -> Array1<PgdFloat> {
        let total = grad_output.sum();
        &grad_output.view() - &(softmax(input) * total)
    }
}

impl fmt::Display for LogSoftmax {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "LogSoftmax")
    }
}
