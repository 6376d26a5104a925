//! Labelled image datasets.
pub mod idx;

pub use idx::{load_mnist, parse_idx, read_idx, IdxArray};

use crate::error::{PgdError, Result};
use crate::tensorshape::TensorShape;
use crate::PgdFloat;
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// A flattened HWC image and its true label
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub image: Array1<PgdFloat>,
    pub label: usize,
}

impl Sample {
    pub fn new(image: Array1<PgdFloat>, label: usize) -> Self {
        Self { image, label }
    }
}

/// A finite, restartable collection of samples that all share one image shape
pub trait Dataset {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn image_shape(&self) -> &TensorShape;

    fn get(&self, idx: usize) -> Option<&Sample>;
}

/// Order in which a sweep visits a dataset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleOrder {
    Sequential,
    /// Reshuffled on every pass, reproducibly for a fixed seed
    Shuffled { seed: u64 },
}

impl Default for SampleOrder {
    fn default() -> Self {
        Self::Sequential
    }
}

impl SampleOrder {
    /// Indices `0..len` in the order visited on pass number `pass`
    pub fn visit_order(&self, len: usize, pass: u64) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();
        if let Self::Shuffled { seed } = *self {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(pass));
            order.shuffle(&mut rng);
        }
        order
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InMemoryDataset {
    image_shape: TensorShape,
    samples: Vec<Sample>,
}

impl InMemoryDataset {
    /// # Errors
    /// If any image's length differs from the number of elements in `image_shape`
    pub fn new(image_shape: TensorShape, samples: Vec<Sample>) -> Result<Self> {
        let expected = image_shape.dims();
        if let Some(bad) = samples.iter().find(|s| s.image.len() != expected) {
            return Err(PgdError::ShapeMismatch {
                context: "dataset image",
                expected,
                actual: bad.image.len(),
            });
        }
        Ok(Self {
            image_shape,
            samples,
        })
    }

}

impl Dataset for InMemoryDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn image_shape(&self) -> &TensorShape {
        &self.image_shape
    }

    fn get(&self, idx: usize) -> Option<&Sample> {
        self.samples.get(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    fn two_pixel(samples: &[([PgdFloat; 2], usize)]) -> Result<InMemoryDataset> {
        InMemoryDataset::new(
            TensorShape::new(vec![1, 2]),
            samples
                .iter()
                .map(|(img, label)| Sample::new(arr1(img), *label))
                .collect(),
        )
    }

    #[test]
    fn test_in_memory_dataset() {
        let ds = two_pixel(&[([0., 1.], 1), ([0.5, 0.25], 0)]).unwrap();
        assert_eq!(ds.len(), 2);
        assert!(!ds.is_empty());
        assert_eq!(ds.get(1).unwrap().label, 0);
        assert!(ds.get(2).is_none());
        assert_eq!(ds.image_shape().dims(), 2);
    }

    #[test]
    fn test_wrong_image_length_rejected() {
        let res = InMemoryDataset::new(
            TensorShape::new(vec![1, 2]),
            vec![Sample::new(arr1(&[0., 1., 2.]), 0)],
        );
        assert!(matches!(
            res,
            Err(PgdError::ShapeMismatch {
                expected: 2,
                actual: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_sequential_order() {
        assert_eq!(SampleOrder::Sequential.visit_order(4, 3), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_shuffled_order_is_reproducible_permutation() {
        let order = SampleOrder::Shuffled { seed: 7 };
        let first = order.visit_order(50, 0);
        assert_eq!(first, order.visit_order(50, 0));
        let mut sorted = first.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
        // Consecutive passes reshuffle
        assert_ne!(first, order.visit_order(50, 1));
    }
}
