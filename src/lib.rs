#![allow(clippy::must_use_candidate)]
//! Projected gradient descent (PGD) attacks against frozen classifiers, and
//! sweeps measuring how accuracy degrades as the L∞ budget grows.
extern crate ndarray;
extern crate ndarray_stats;
extern crate num;
extern crate rand;

pub mod affine;
pub mod attack;
pub mod bounds;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod dnn;
pub mod error;
pub mod logging;
pub mod loss;
pub mod report;
pub mod sweep;
pub mod tensorshape;

#[cfg(test)]
mod test_util;

pub type PgdFloat = f64;

pub use crate::attack::{AttackParams, Pgd};
pub use crate::bounds::Bounds1;
pub use crate::classifier::{Classifier, LossGradient};
pub use crate::dataset::{Dataset, InMemoryDataset, Sample, SampleOrder};
pub use crate::dnn::DNN;
pub use crate::error::{PgdError, Result};
pub use crate::sweep::{AdversarialExample, EpsilonResult, EvaluationContext, SweepReport};
pub use crate::tensorshape::TensorShape;
