#![allow(dead_code)]
use ndarray::{Array, Array1};
use ndarray_rand::rand_distr::{Normal, Uniform};
use ndarray_rand::RandomExt;
use pgd_rs::dnn::{Conv, Dense, Layer, LogSoftmax, MaxPool, ReLU};
use pgd_rs::{Classifier, InMemoryDataset, Sample, TensorShape, DNN};
use rand::Rng;

pub const SIDE: usize = 8;
pub const CLASSES: usize = 4;

/// Conv 3x3 (8x8x1 -> 6x6x3), 2x2 max pool, ReLU, dense to `CLASSES`, log-softmax
pub fn build_lenet<R: Rng>(rng: &mut R) -> DNN {
    let normal = Normal::new(0., 1.).unwrap();
    let conv = Conv::new(
        Array::random_using((3, 3, 1, 3), normal, rng),
        Array::random_using(3, normal, rng),
        TensorShape::image(SIDE, SIDE, 1),
        (1, 1),
        ((0, 0), (0, 0)),
    );
    let pool = MaxPool::new(TensorShape::image(6, 6, 3), 2);
    let dense = Dense::from_parts(
        Array::random_using((CLASSES, 27), normal, rng),
        Array::random_using(CLASSES, normal, rng),
    );
    DNN::new(vec![
        Layer::Conv(conv),
        Layer::MaxPool(pool),
        Layer::ReLU(ReLU::new(27)),
        Layer::Dense(dense),
        Layer::LogSoftmax(LogSoftmax::new()),
    ])
    .unwrap()
}

pub fn random_image<R: Rng>(rng: &mut R) -> Array1<f64> {
    Array::random_using(SIDE * SIDE, Uniform::new_inclusive(0., 1.), rng)
}

/// `n` random images labelled with the model's own prediction, except every
/// `wrong_every`-th one which gets a different label.
pub fn labelled_by<R: Rng>(model: &DNN, n: usize, wrong_every: usize, rng: &mut R) -> InMemoryDataset {
    let samples = (0..n)
        .map(|i| {
            let image = random_image(rng);
            let pred = model.predict(&image.view()).unwrap();
            let label = if wrong_every > 0 && i % wrong_every == wrong_every - 1 {
                (pred + 1) % CLASSES
            } else {
                pred
            };
            Sample::new(image, label)
        })
        .collect();
    InMemoryDataset::new(TensorShape::image(SIDE, SIDE, 1), samples).unwrap()
}

/// Bytes of an unsigned-byte IDX file
pub fn encode_idx(dims: &[u32], data: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0, 0, 0x08, dims.len() as u8];
    for d in dims {
        bytes.extend_from_slice(&d.to_be_bytes());
    }
    bytes.extend_from_slice(data);
    bytes
}
