#![cfg(test)]
use crate::affine::Affine2;
use crate::dnn::{Dense, Layer};
use crate::PgdFloat;
use crate::DNN;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Array3;
use ndarray::Array4;
use ndarray::ArrayView1;
use ndarray::Axis;
use proptest::arbitrary::functor::ArbitraryF1;
use proptest::prelude::*;
use proptest::sample::SizeRange;

prop_compose! {
    pub fn array1(len: usize)(v in Vec::lift1_with(-10. .. 10., SizeRange::new(len..=len))) -> Array1<PgdFloat> {
        Array1::from_vec(v)
    }
}

prop_compose! {
    pub fn array2(rows: usize, cols: usize)(v in Vec::lift1_with(array1(cols), SizeRange::new(rows..=rows))) -> Array2<PgdFloat> {
        assert!(rows > 0);
        ndarray::stack(Axis(0), &v.iter().map(|x| x.view()).collect::<Vec<ArrayView1<PgdFloat>>>()).unwrap()
    }
}

prop_compose! {
    pub fn array3(d0: usize, d1: usize, d2: usize)(v in Vec::lift1_with(-10. .. 10., SizeRange::new(d0 * d1 * d2..=d0 * d1 * d2))) -> Array3<PgdFloat> {
        Array3::from_shape_vec((d0, d1, d2), v).unwrap()
    }
}

prop_compose! {
    pub fn array4(d0: usize, d1: usize, d2: usize, d3: usize)(v in Vec::lift1_with(-10. .. 10., SizeRange::new(d0 * d1 * d2 * d3..=d0 * d1 * d2 * d3))) -> Array4<PgdFloat> {
        Array4::from_shape_vec((d0, d1, d2, d3), v).unwrap()
    }
}

prop_compose! {
    /// A flattened image with pixels in `[0, 1]`
    pub fn image(len: usize)(v in Vec::lift1_with(0. ..=1., SizeRange::new(len..=len))) -> Array1<PgdFloat> {
        Array1::from_vec(v)
    }
}

prop_compose! {
    pub fn affine2(in_dim: usize, out_dim: usize)(basis in array2(out_dim, in_dim), shift in array1(out_dim)) -> Affine2 {
        Affine2::new(basis, shift)
    }
}

prop_compose! {
    /// Dense layers with a ReLU between each pair, ending in a dense layer of `output_size` scores
    pub fn fc_dnn(input_size: usize, output_size: usize, nlayers: usize, max_layer_width: usize)(repr_sizes in Vec::lift1_with(1..max_layer_width, SizeRange::new(nlayers..=nlayers)).prop_map(move |mut x| {x.insert(0, input_size); x.push(output_size); x}))(affines in {let pairs = repr_sizes.iter().zip(repr_sizes.iter().skip(1)); pairs.map(|(&x, &y)| affine2(x,y)).collect::<Vec<_>>()}) -> DNN {
        let num_affines = affines.len();
        let mut layers = vec![];
        affines.into_iter().enumerate().for_each(|(idx, aff)| {
            let output_dim = aff.output_dim();
            layers.push(Layer::new_dense(Dense::new(aff)));
            if idx + 1 < num_affines {
                layers.push(Layer::new_relu(output_dim));
            }
        });
        DNN::new(layers).unwrap()
    }
}
