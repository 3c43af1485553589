#![allow(dead_code)]
use advgen::{Dataset, SoftmaxClassifier};
use ndarray::{Array1, Array4};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;

pub fn make_dataset<R: Rng>(
    len: usize,
    dims: (usize, usize, usize),
    classes: usize,
    rng: &mut R,
) -> Dataset {
    let (h, w, c) = dims;
    let images = Array4::random_using((len, h, w, c), Uniform::new(0., 1.), rng);
    let labels: Array1<usize> = (0..len).map(|_| rng.gen_range(0..classes)).collect();
    Dataset::new(images, labels).unwrap()
}

pub fn make_model<R: Rng>(
    dims: (usize, usize, usize),
    classes: usize,
    rng: &mut R,
) -> SoftmaxClassifier {
    SoftmaxClassifier::random(dims, classes, rng)
}
