//! Classification losses over a vector of class scores.
//!
//! Scores may be logits or log-probabilities. `log_softmax` is idempotent on
//! log-probabilities, so the cross-entropy of a network ending in a
//! log-softmax layer equals its negative log-likelihood.
//!
//! All functions index `scores[label]` and panic if `label` is out of range;
//! [`crate::Classifier`] implementations check labels before calling them.
use crate::PgdFloat;
use ndarray::{Array1, ArrayView1};

/// Numerically stable `log(sum(exp(scores)))`
pub fn logsumexp(scores: &ArrayView1<PgdFloat>) -> PgdFloat {
    let max = scores.fold(PgdFloat::NEG_INFINITY, |acc, &x| acc.max(x));
    if !max.is_finite() {
        return max;
    }
    max + scores.mapv(|x| (x - max).exp()).sum().ln()
}

pub fn log_softmax(scores: &ArrayView1<PgdFloat>) -> Array1<PgdFloat> {
    let lse = logsumexp(scores);
    scores.mapv(|x| x - lse)
}

pub fn softmax(scores: &ArrayView1<PgdFloat>) -> Array1<PgdFloat> {
    log_softmax(scores).mapv(PgdFloat::exp)
}

/// Cross-entropy of `scores` against the class `label`
pub fn cross_entropy(scores: &ArrayView1<PgdFloat>, label: usize) -> PgdFloat {
    logsumexp(scores) - scores[label]
}

/// Gradient of [`cross_entropy`] with respect to the scores: `softmax(scores) - onehot(label)`
pub fn cross_entropy_grad(scores: &ArrayView1<PgdFloat>, label: usize) -> Array1<PgdFloat> {
    let mut grad = softmax(scores);
    grad[label] -= 1.;
    grad
}

/// Negative log-likelihood, for scores that are already log-probabilities
pub fn nll_loss(log_probs: &ArrayView1<PgdFloat>, label: usize) -> PgdFloat {
    -log_probs[label]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn test_uniform_scores() {
        let scores = Array1::from_elem(4, 3.0);
        assert_abs_diff_eq!(cross_entropy(&scores.view(), 2), (4.0_f64).ln(), epsilon = 1e-12);
        let grad = cross_entropy_grad(&scores.view(), 2);
        assert_abs_diff_eq!(grad, Array1::from_vec(vec![0.25, 0.25, -0.75, 0.25]), epsilon = 1e-12);
    }

    #[test]
    fn test_large_scores_do_not_overflow() {
        let scores = Array1::from_vec(vec![1000., 0.]);
        assert!(cross_entropy(&scores.view(), 0).abs() < 1e-12);
        assert_abs_diff_eq!(cross_entropy(&scores.view(), 1), 1000., epsilon = 1e-9);
    }

    proptest! {
        #[test]
        fn test_cross_entropy_equals_nll_of_log_softmax(scores in array1(10), label in 0_usize..10) {
            let log_probs = log_softmax(&scores.view());
            let ce = cross_entropy(&scores.view(), label);
            prop_assert!((ce - nll_loss(&log_probs.view(), label)).abs() < 1e-9);
            // log_softmax is idempotent, so a log-softmax output layer gives the same loss
            prop_assert!((ce - cross_entropy(&log_probs.view(), label)).abs() < 1e-9);
        }

        #[test]
        fn test_gradient_sums_to_zero(scores in array1(10), label in 0_usize..10) {
            let grad = cross_entropy_grad(&scores.view(), label);
            prop_assert!(grad.sum().abs() < 1e-9);
            prop_assert!(grad[label] <= 0.);
        }
    }
}
