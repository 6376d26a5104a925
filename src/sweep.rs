//! Robust accuracy of a classifier under PGD, swept over perturbation budgets.
use crate::attack::{AttackParams, Pgd};
use crate::classifier::Classifier;
use crate::dataset::{Dataset, SampleOrder};
use crate::error::{PgdError, Result};
use crate::tensorshape::TensorShape;
use crate::PgdFloat;
use log::{debug, info};
use ndarray::Array1;
use num::Zero;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SAMPLE_CAP: usize = 7;

/// An attacked image with its prediction before and after the attack
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdversarialExample {
    pub original_label: usize,
    pub adversarial_label: usize,
    pub image: Array1<PgdFloat>,
}

impl AdversarialExample {
    pub fn is_flipped(&self) -> bool {
        self.original_label != self.adversarial_label
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpsilonResult {
    pub epsilon: PgdFloat,
    /// Samples classified correctly both before and after the attack
    pub correct: usize,
    /// Every visited sample, including those misclassified before the attack
    pub total: usize,
    pub accuracy: PgdFloat,
    pub examples: Vec<AdversarialExample>,
}

/// Per-epsilon results, in the order the budgets were given
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub image_shape: TensorShape,
    pub results: Vec<EpsilonResult>,
}

impl SweepReport {
    pub fn epsilons(&self) -> Vec<PgdFloat> {
        self.results.iter().map(|r| r.epsilon).collect()
    }

    pub fn accuracies(&self) -> Vec<PgdFloat> {
        self.results.iter().map(|r| r.accuracy).collect()
    }
}

/// Everything an evaluation needs: the frozen model, the data, the attack
/// settings and how many examples to keep per budget.
pub struct EvaluationContext<'a, C: Classifier + ?Sized, D: Dataset> {
    model: &'a C,
    dataset: &'a D,
    attack: AttackParams,
    sample_cap: usize,
    order: SampleOrder,
}

impl<'a, C: Classifier + ?Sized, D: Dataset> EvaluationContext<'a, C, D> {
    /// # Errors
    /// If the dataset is empty or its images do not fit the model's input
    pub fn new(model: &'a C, dataset: &'a D) -> Result<Self> {
        if dataset.is_empty() {
            return Err(PgdError::EmptyDataset);
        }
        let dims = dataset.image_shape().dims();
        if dims != model.input_dims() {
            return Err(PgdError::ShapeMismatch {
                context: "dataset images for classifier",
                expected: model.input_dims(),
                actual: dims,
            });
        }
        Ok(Self {
            model,
            dataset,
            attack: AttackParams::default(),
            sample_cap: DEFAULT_SAMPLE_CAP,
            order: SampleOrder::default(),
        })
    }

    /// Attack settings; the epsilon is replaced by each evaluated budget
    #[must_use]
    pub fn with_attack(mut self, attack: AttackParams) -> Self {
        self.attack = attack;
        self
    }

    #[must_use]
    pub fn with_sample_cap(mut self, sample_cap: usize) -> Self {
        self.sample_cap = sample_cap;
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: SampleOrder) -> Self {
        self.order = order;
        self
    }

    /// Attacks every correctly classified sample with budget `epsilon`
    ///
    /// # Errors
    /// If `epsilon` or the attack settings are invalid, or any sample fails
    pub fn evaluate(&self, epsilon: PgdFloat) -> Result<EpsilonResult> {
        self.evaluate_pass(epsilon, 0)
    }

    fn evaluate_pass(&self, epsilon: PgdFloat, pass: u64) -> Result<EpsilonResult> {
        let pgd = Pgd::new(self.attack.with_epsilon(epsilon))?;
        let total = self.dataset.len();
        let mut correct = 0;
        let mut examples = Vec::with_capacity(self.sample_cap);

        for idx in self.order.visit_order(total, pass) {
            let sample = self
                .dataset
                .get(idx)
                .ok_or(PgdError::MissingSample(idx))?;
            let image = sample.image.view();
            let init_pred = self.model.predict(&image)?;
            if init_pred != sample.label {
                debug!("Sample {} misclassified before attack, skipping", idx);
                continue;
            }

            let primed = self.model.loss_gradient(&image, sample.label)?;
            let adv = pgd.perturb_primed(self.model, &image, sample.label, primed)?;
            let final_pred = self.model.predict(&adv.view())?;
            debug!(
                "Sample {}: label {} predicted {} after attack",
                idx, sample.label, final_pred
            );

            let keep = examples.len() < self.sample_cap;
            if final_pred == sample.label {
                correct += 1;
                if keep && epsilon.is_zero() {
                    examples.push(AdversarialExample {
                        original_label: init_pred,
                        adversarial_label: final_pred,
                        image: adv,
                    });
                }
            } else if keep {
                examples.push(AdversarialExample {
                    original_label: init_pred,
                    adversarial_label: final_pred,
                    image: adv,
                });
            }
        }

        let accuracy = correct as PgdFloat / total as PgdFloat;
        info!(
            "Epsilon: {}\tTest accuracy = {}/{} = {}",
            epsilon, correct, total, accuracy
        );
        Ok(EpsilonResult {
            epsilon,
            correct,
            total,
            accuracy,
            examples,
        })
    }

    /// Evaluates each budget in turn, one result per budget in input order
    ///
    /// # Errors
    /// On the first budget that fails to evaluate
    pub fn sweep(&self, epsilons: &[PgdFloat]) -> Result<SweepReport> {
        let results = epsilons
            .iter()
            .zip(0_u64..)
            .map(|(&epsilon, pass)| self.evaluate_pass(epsilon, pass))
            .collect::<Result<Vec<_>>>()?;
        Ok(SweepReport {
            image_shape: self.dataset.image_shape().clone(),
            results,
        })
    }
}
