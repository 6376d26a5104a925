use crate::dnn::layer::Operation;
use crate::error::{PgdError, Result};
use crate::PgdFloat;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dropout in evaluation mode, which is the identity.
///
/// Networks here are frozen, so the drop probability is only kept to describe
/// the trained architecture.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Dropout {
    prob: PgdFloat,
}

impl Dropout {
    pub const fn new(prob: PgdFloat) -> Self {
        Self { prob }
    }
}

impl Operation for Dropout {
    fn forward1(&self, input: &ArrayView1<PgdFloat>) -> Array1<PgdFloat> {
        input.to_owned()
    }

    fn backward1(
        &self,
        _input: &ArrayView1<PgdFloat>,
        grad_output: &ArrayView1<PgdFloat>,
    ) -> Array1<PgdFloat> {
        grad_output.to_owned()
    }

    fn validate(&self) -> Result<()> {
        if (0. ..1.).contains(&self.prob) {
            Ok(())
        } else {
            Err(PgdError::InvalidNetwork(format!(
                "dropout probability {} outside [0, 1)",
                self.prob
            )))
        }
    }
}

impl fmt::Display for Dropout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Dropout {}", self.prob)
    }
}
