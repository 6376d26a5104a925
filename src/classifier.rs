//! The classifier collaborator an attack runs against.
use crate::error::{PgdError, Result};
use crate::PgdFloat;
use ndarray::{Array1, ArrayView1};
use ndarray_stats::QuantileExt;

/// Loss of a classifier at one input, with its gradient with respect to that input.
#[derive(Clone, Debug, PartialEq)]
pub struct LossGradient {
    pub loss: PgdFloat,
    /// Class scores the loss was computed from
    pub scores: Array1<PgdFloat>,
    /// d(loss)/d(input), same length as the input
    pub gradient: Array1<PgdFloat>,
}

impl LossGradient {
    /// # Errors
    /// If the scores contain NaN
    pub fn predicted(&self) -> Result<usize> {
        argmax(&self.scores.view())
    }
}

/// A frozen, differentiable classifier over flattened inputs.
///
/// Implementations must not keep gradient state between calls: every call to
/// [`Classifier::loss_gradient`] computes its gradient from scratch.
pub trait Classifier {
    /// Length of the flattened input
    fn input_dims(&self) -> usize;

    fn num_classes(&self) -> usize;

    /// Class scores (logits or log-probabilities) for one input
    ///
    /// # Errors
    /// If the input has the wrong length
    fn forward(&self, input: &ArrayView1<PgdFloat>) -> Result<Array1<PgdFloat>>;

    /// Cross-entropy loss against `label` and its gradient with respect to `input`
    ///
    /// # Errors
    /// If the input has the wrong length or the label is out of range
    fn loss_gradient(&self, input: &ArrayView1<PgdFloat>, label: usize) -> Result<LossGradient>;

    /// Index of the largest class score
    ///
    /// # Errors
    /// If the forward pass fails or the scores contain NaN
    fn predict(&self, input: &ArrayView1<PgdFloat>) -> Result<usize> {
        argmax(&self.forward(input)?.view())
    }

    /// # Errors
    fn check_input(&self, input: &ArrayView1<PgdFloat>) -> Result<()> {
        if input.len() == self.input_dims() {
            Ok(())
        } else {
            Err(PgdError::ShapeMismatch {
                context: "classifier input",
                expected: self.input_dims(),
                actual: input.len(),
            })
        }
    }

    /// # Errors
    fn check_label(&self, label: usize) -> Result<()> {
        if label < self.num_classes() {
            Ok(())
        } else {
            Err(PgdError::LabelOutOfRange {
                label,
                num_classes: self.num_classes(),
            })
        }
    }
}

/// Sign with `sign(0) == 0`, unlike `f64::signum`
pub fn sign(x: PgdFloat) -> PgdFloat {
    if x > 0. {
        1.
    } else if x < 0. {
        -1.
    } else {
        0.
    }
}

/// # Errors
/// If `scores` is empty or contains NaN
pub fn argmax(scores: &ArrayView1<PgdFloat>) -> Result<usize> {
    Ok(scores.argmax()?)
}
