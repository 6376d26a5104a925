//! L∞ projected gradient descent.
//!
//! Each iteration steps the current image along the sign of the loss gradient,
//! then projects the accumulated perturbation back onto the epsilon ball around
//! the original image and clamps to the valid pixel range:
//!
//! ```text
//! adv       = current + step_size * sign(grad)
//! eta       = clamp(adv - original, -epsilon, epsilon)
//! perturbed = clamp(original + eta, min, max)
//! ```
use crate::bounds::Bounds1;
use crate::classifier::{sign, Classifier, LossGradient};
use crate::error::{PgdError, Result};
use crate::PgdFloat;
use log::trace;
use more_asserts::{assert_le, debug_assert_le};
use ndarray::{Array1, ArrayView1, Zip};
use serde::{Deserialize, Serialize};

pub const DEFAULT_STEP_SIZE: PgdFloat = 1. / 255.;
pub const DEFAULT_ITERATIONS: usize = 20;
pub const DEFAULT_PIXEL_RANGE: (PgdFloat, PgdFloat) = (0., 1.);

/// Configuration for a PGD attack.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttackParams {
    /// Maximum absolute per-element perturbation
    pub epsilon: PgdFloat,
    /// Magnitude of each step before projection
    pub step_size: PgdFloat,
    pub iterations: usize,
    /// Valid `(min, max)` pixel values
    pub pixel_range: (PgdFloat, PgdFloat),
    /// Stop once the current image is misclassified
    pub early_stop: bool,
}

impl Default for AttackParams {
    fn default() -> Self {
        Self {
            epsilon: 0.,
            step_size: DEFAULT_STEP_SIZE,
            iterations: DEFAULT_ITERATIONS,
            pixel_range: DEFAULT_PIXEL_RANGE,
            early_stop: false,
        }
    }
}

impl AttackParams {
    pub fn new(epsilon: PgdFloat, step_size: PgdFloat, iterations: usize) -> Self {
        Self {
            epsilon,
            step_size,
            iterations,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_epsilon(mut self, epsilon: PgdFloat) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// # Errors
    /// If epsilon is negative, the step size is not positive, there are no
    /// iterations, or the pixel range is empty. Non-finite values are rejected.
    pub fn validate(&self) -> Result<()> {
        if !self.epsilon.is_finite() || self.epsilon < 0. {
            return Err(PgdError::invalid(
                "epsilon",
                self.epsilon,
                "must be finite and non-negative",
            ));
        }
        if !self.step_size.is_finite() || self.step_size <= 0. {
            return Err(PgdError::invalid(
                "step_size",
                self.step_size,
                "must be finite and positive",
            ));
        }
        if self.iterations < 1 {
            return Err(PgdError::invalid(
                "iterations",
                self.iterations,
                "must be at least 1",
            ));
        }
        let (min, max) = self.pixel_range;
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(PgdError::invalid(
                "pixel_range",
                format!("({}, {})", min, max),
                "must be finite with min < max",
            ));
        }
        Ok(())
    }
}

/// Maximum absolute elementwise difference
pub fn linf_distance(a: &ArrayView1<PgdFloat>, b: &ArrayView1<PgdFloat>) -> PgdFloat {
    Zip::from(a)
        .and(b)
        .fold(0., |acc, &x, &y| PgdFloat::max(acc, (x - y).abs()))
}

/// A validated PGD attacker
#[derive(Clone, Debug)]
pub struct Pgd {
    params: AttackParams,
}

impl Pgd {
    /// # Errors
    /// If the parameters fail [`AttackParams::validate`]
    pub fn new(params: AttackParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub const fn params(&self) -> &AttackParams {
        &self.params
    }

    /// Every image the attack can produce from `original` lies in this set
    pub fn feasible_set(&self, original: &ArrayView1<PgdFloat>) -> Bounds1 {
        Bounds1::linf_ball(original.view(), self.params.epsilon, self.params.pixel_range)
    }

    /// # Errors
    /// If any pixel of `image` is NaN or outside the pixel range
    pub fn check_pixels(&self, image: &ArrayView1<PgdFloat>) -> Result<()> {
        let (min, max) = self.params.pixel_range;
        match image.iter().position(|p| !(min..=max).contains(p)) {
            Some(index) => Err(PgdError::PixelOutOfRange {
                index,
                value: image[index],
                min,
                max,
            }),
            None => Ok(()),
        }
    }

    /// One step from `current`: ascend along `sign(gradient)`, then project
    pub fn step(
        &self,
        original: &ArrayView1<PgdFloat>,
        current: &ArrayView1<PgdFloat>,
        gradient: &ArrayView1<PgdFloat>,
    ) -> Array1<PgdFloat> {
        let AttackParams {
            epsilon,
            step_size,
            pixel_range: (min, max),
            ..
        } = self.params;
        Zip::from(original)
            .and(current)
            .and(gradient)
            .map_collect(|&orig, &cur, &grad| {
                let adv = cur + step_size * sign(grad);
                let eta = num::clamp(adv - orig, -epsilon, epsilon);
                num::clamp(orig + eta, min, max)
            })
    }

    /// Runs the attack and returns the perturbed image
    ///
    /// # Errors
    /// If the image has pixels outside the range, or the classifier rejects
    /// the image or label
    pub fn perturb<C: Classifier + ?Sized>(
        &self,
        model: &C,
        image: &ArrayView1<PgdFloat>,
        label: usize,
    ) -> Result<Array1<PgdFloat>> {
        self.perturb_observed(model, image, label, None, |_, _| {})
    }

    /// Runs the attack, using `primed` as the gradient of the first iteration.
    ///
    /// `primed` must be the loss gradient at `image` itself.
    ///
    /// # Errors
    /// If the classifier rejects the image or label
    pub fn perturb_primed<C: Classifier + ?Sized>(
        &self,
        model: &C,
        image: &ArrayView1<PgdFloat>,
        label: usize,
        primed: LossGradient,
    ) -> Result<Array1<PgdFloat>> {
        self.perturb_observed(model, image, label, Some(primed), |_, _| {})
    }

    /// Runs the attack, calling `observer` with the iteration index and the
    /// projected image after every step.
    ///
    /// # Errors
    /// If the classifier rejects the image or label
    pub fn perturb_observed<C, F>(
        &self,
        model: &C,
        image: &ArrayView1<PgdFloat>,
        label: usize,
        mut primed: Option<LossGradient>,
        mut observer: F,
    ) -> Result<Array1<PgdFloat>>
    where
        C: Classifier + ?Sized,
        F: FnMut(usize, &ArrayView1<PgdFloat>),
    {
        model.check_input(image)?;
        model.check_label(label)?;
        self.check_pixels(image)?;
        #[cfg(debug_assertions)]
        let feasible = self.feasible_set(image);

        let mut current = image.to_owned();
        for iteration in 0..self.params.iterations {
            let grad = match primed.take() {
                Some(grad) => {
                    debug_assert_eq!(grad.gradient.len(), image.len());
                    grad
                }
                None => model.loss_gradient(&current.view(), label)?,
            };
            trace!("PGD iteration {} loss {}", iteration, grad.loss);
            if self.params.early_stop && grad.predicted()? != label {
                trace!("Misclassified after {} iterations, stopping", iteration);
                break;
            }

            current = self.step(image, &current.view(), &grad.gradient.view());
            debug_assert_le!(
                linf_distance(&current.view(), image),
                self.params.epsilon + 1e-12
            );
            #[cfg(debug_assertions)]
            debug_assert!(feasible.is_member(&current.view()));
            observer(iteration, &current.view());
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dnn::{Dense, Layer};
    use crate::test_util::*;
    use crate::DNN;
    use ndarray::Array2;
    use proptest::prelude::*;

    /// Two classes, two inputs: class 0 scores x0 - x1, class 1 scores x1 - x0
    fn toy_linear() -> DNN {
        let weights = Array2::from_shape_vec((2, 2), vec![1., -1., -1., 1.]).unwrap();
        DNN::new(vec![Layer::new_dense(Dense::from_parts(weights, Array1::zeros(2)))]).unwrap()
    }

    #[test]
    fn test_single_step_matches_hand_computation() {
        // For label 0 the loss gradient is p1 * (W[1] - W[0]) = p1 * (-2, 2)
        let model = toy_linear();
        let original = Array1::from_vec(vec![0.5, 0.95]);
        let pgd = Pgd::new(AttackParams::new(0.1, 0.1, 1)).unwrap();
        let adv = pgd.perturb(&model, &original.view(), 0).unwrap();
        let expected = Array1::from_vec(vec![
            num::clamp(0.5 - 0.1, 0., 1.),
            num::clamp(0.95 + 0.1, 0., 1.),
        ]);
        assert_eq!(adv, expected);
        assert_eq!(adv[1], 1.);
    }

    #[test]
    fn test_small_step_stays_inside_ball() {
        let model = toy_linear();
        let original = Array1::from_vec(vec![0.5, 0.5]);
        let pgd = Pgd::new(AttackParams::new(0.1, 0.05, 1)).unwrap();
        let adv = pgd.perturb(&model, &original.view(), 0).unwrap();
        assert_eq!(adv.to_vec(), vec![0.5 - 0.05, 0.5 + 0.05]);
    }

    #[test]
    fn test_large_step_is_projected_to_budget() {
        let model = toy_linear();
        let original = Array1::from_vec(vec![0.5, 0.5]);
        let pgd = Pgd::new(AttackParams::new(0.1, 0.25, 3)).unwrap();
        let adv = pgd.perturb(&model, &original.view(), 0).unwrap();
        assert_eq!(adv.to_vec(), vec![0.5 - 0.1, 0.5 + 0.1]);
    }

    #[test]
    fn test_zero_gradient_does_not_move() {
        // A constant model has a zero input gradient everywhere
        let model = DNN::new(vec![Layer::new_dense(Dense::from_parts(
            Array2::zeros((2, 2)),
            Array1::zeros(2),
        ))])
        .unwrap();
        let original = Array1::from_vec(vec![0.25, 0.75]);
        let pgd = Pgd::new(AttackParams::new(0.3, 0.1, 5)).unwrap();
        assert_eq!(pgd.perturb(&model, &original.view(), 1).unwrap(), original);
    }

    #[test]
    fn test_iterations_accumulate_from_current_image() {
        let model = toy_linear();
        let original = Array1::from_vec(vec![0.5, 0.5]);
        let pgd = Pgd::new(AttackParams::new(0.25, 0.0625, 3)).unwrap();
        let mut seen = vec![];
        let adv = pgd
            .perturb_observed(&model, &original.view(), 0, None, |i, x| seen.push((i, x.to_owned())))
            .unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].1.to_vec(), vec![0.4375, 0.5625]);
        assert_eq!(seen[1].1.to_vec(), vec![0.375, 0.625]);
        assert_eq!(adv.to_vec(), vec![0.3125, 0.6875]);
    }

    #[test]
    fn test_primed_gradient_gives_same_result() {
        let model = toy_linear();
        let original = Array1::from_vec(vec![0.3, 0.6]);
        let pgd = Pgd::new(AttackParams::new(0.2, 0.05, 4)).unwrap();
        let primed = model.loss_gradient(&original.view(), 1).unwrap();
        assert_eq!(
            pgd.perturb_primed(&model, &original.view(), 1, primed).unwrap(),
            pgd.perturb(&model, &original.view(), 1).unwrap()
        );
    }

    #[test]
    fn test_early_stop_ends_once_misclassified() {
        let model = toy_linear();
        // Class 0 is predicted with margin 0.1, one step of 0.1 on each input flips it
        let original = Array1::from_vec(vec![0.55, 0.5]);
        let mut params = AttackParams::new(0.3, 0.1, 10);
        params.early_stop = true;
        let pgd = Pgd::new(params).unwrap();
        let mut steps = 0;
        let adv = pgd
            .perturb_observed(&model, &original.view(), 0, None, |_, _| steps += 1)
            .unwrap();
        assert_eq!(steps, 1);
        assert_eq!(model.predict(&adv.view()).unwrap(), 1);

        params.early_stop = false;
        let mut steps = 0;
        Pgd::new(params)
            .unwrap()
            .perturb_observed(&model, &original.view(), 0, None, |_, _| steps += 1)
            .unwrap();
        assert_eq!(steps, 10);
    }

    #[test]
    fn test_degenerate_parameters_rejected() {
        assert!(Pgd::new(AttackParams::new(0.1, 0.01, 0)).is_err());
        assert!(Pgd::new(AttackParams::new(0.1, 0., 10)).is_err());
        assert!(Pgd::new(AttackParams::new(0.1, -0.01, 10)).is_err());
        assert!(Pgd::new(AttackParams::new(-0.1, 0.01, 10)).is_err());
        assert!(Pgd::new(AttackParams::new(PgdFloat::NAN, 0.01, 10)).is_err());
        let mut params = AttackParams::new(0.1, 0.01, 10);
        params.pixel_range = (1., 0.);
        assert!(matches!(
            Pgd::new(params),
            Err(PgdError::InvalidParameter {
                name: "pixel_range",
                ..
            })
        ));
    }

    #[test]
    fn test_shape_mismatch_fails_fast() {
        let model = toy_linear();
        let pgd = Pgd::new(AttackParams::new(0.1, 0.01, 10)).unwrap();
        let image = Array1::zeros(3);
        assert!(matches!(
            pgd.perturb(&model, &image.view(), 0),
            Err(PgdError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_pixels_outside_range_rejected() {
        let model = toy_linear();
        let pgd = Pgd::new(AttackParams::new(0.1, 0.05, 1)).unwrap();
        let bright = Array1::from_vec(vec![1.5, 0.5]);
        assert!(matches!(
            pgd.perturb(&model, &bright.view(), 0),
            Err(PgdError::PixelOutOfRange { index: 0, .. })
        ));
        let nan = Array1::from_vec(vec![0.5, PgdFloat::NAN]);
        assert!(matches!(
            pgd.perturb(&model, &nan.view(), 0),
            Err(PgdError::PixelOutOfRange { index: 1, .. })
        ));
        let edges = Array1::from_vec(vec![0., 1.]);
        assert!(pgd.perturb(&model, &edges.view(), 1).is_ok());
    }

    proptest! {
        #[test]
        fn test_every_iterate_is_feasible(
            dnn in fc_dnn(6, 3, 1, 5),
            original in image(6),
            label in 0_usize..3,
            epsilon in 0. ..0.5,
            step_size in 0.001 ..0.2,
        ) {
            let pgd = Pgd::new(AttackParams::new(epsilon, step_size, 8)).unwrap();
            let feasible = pgd.feasible_set(&original.view());
            let mut violations = vec![];
            pgd.perturb_observed(&dnn, &original.view(), label, None, |i, x| {
                if linf_distance(x, &original.view()) > epsilon + 1e-12
                    || x.iter().any(|&p| !(0. ..=1.).contains(&p))
                    || !feasible.is_member(x)
                {
                    violations.push(i);
                }
            }).unwrap();
            prop_assert!(violations.is_empty(), "infeasible iterates: {:?}", violations);
        }

        #[test]
        fn test_zero_epsilon_returns_original(
            dnn in fc_dnn(6, 3, 1, 5),
            original in image(6),
            label in 0_usize..3,
        ) {
            let pgd = Pgd::new(AttackParams::new(0., 1. / 255., 20)).unwrap();
            let adv = pgd.perturb(&dnn, &original.view(), label).unwrap();
            prop_assert_eq!(adv, original);
        }
    }
}
