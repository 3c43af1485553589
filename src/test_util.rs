#![cfg(test)]
use crate::affine::Affine2;
use crate::dataset::Dataset;
use crate::AdvFloat;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Array4;
use ndarray::ArrayView1;
use ndarray::Axis;
use proptest::arbitrary::functor::ArbitraryF1;
use proptest::prelude::*;
use proptest::sample::SizeRange;

prop_compose! {
    pub fn array1(len: usize)(v in Vec::lift1_with(-10. .. 10., SizeRange::new(len..=len))) -> Array1<AdvFloat> {
        Array1::from_vec(v)
    }
}

prop_compose! {
    pub fn array2(rows: usize, cols: usize)(v in Vec::lift1_with(array1(cols), SizeRange::new(rows..=rows))) -> Array2<AdvFloat> {
        assert!(rows > 0);
        ndarray::stack(Axis(0), &v.iter().map(|x| x.view()).collect::<Vec<ArrayView1<AdvFloat>>>()).unwrap()
    }
}

prop_compose! {
    pub fn affine2(in_dim: usize, out_dim: usize)(basis in array2(out_dim, in_dim), shift in array1(out_dim)) -> Affine2 {
        Affine2::new(basis, shift)
    }
}

prop_compose! {
    /// Image dims with at most `max_side` rows/columns and 1 or 3 channels
    pub fn image_dims(max_side: usize)(h in 1..=max_side, w in 1..=max_side, c in prop_oneof![Just(1usize), Just(3usize)]) -> (usize, usize, usize) {
        (h, w, c)
    }
}

prop_compose! {
    /// A dataset of unit-scaled pixels whose labels are `index % classes`
    pub fn image_dataset(max_len: usize, classes: usize)(len in 1..=max_len, dims in image_dims(4))(pixels in Vec::lift1_with(0. .. 1., SizeRange::new(len * dims.0 * dims.1 * dims.2..=len * dims.0 * dims.1 * dims.2)), len in Just(len), dims in Just(dims)) -> (Dataset, (usize, usize, usize)) {
        let images = Array4::from_shape_vec((len, dims.0, dims.1, dims.2), pixels).unwrap();
        let labels = Array1::from_iter((0..len).map(|i| i % classes));
        (Dataset::new(images, labels).unwrap(), dims)
    }
}
