use crate::tensorshape::TensorShape;
use crate::AdvFloat;
use itertools::Itertools;
use ndarray::{Array1, Array4, ArrayView1, ArrayView3, ArrayView4, Axis};
use serde::Serialize;
use std::fmt;

/// One unit of generator output: perturbed images with their unchanged labels
///
/// Position `i` of `images`, `labels` and `indices` all describe the same source example.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Batch {
    images: Array4<AdvFloat>,
    labels: Array1<usize>,
    indices: Vec<usize>,
}

impl Batch {
    /// # Panics
    /// If the three parts disagree on length (debug builds only)
    pub fn new(images: Array4<AdvFloat>, labels: Array1<usize>, indices: Vec<usize>) -> Self {
        debug_assert_eq!(images.len_of(Axis(0)), labels.len());
        debug_assert_eq!(labels.len(), indices.len());
        debug_assert!(indices.iter().all_unique());
        Self {
            images,
            labels,
            indices,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `(total, height, width, channels)`
    pub fn images(&self) -> ArrayView4<AdvFloat> {
        self.images.view()
    }

    pub fn labels(&self) -> ArrayView1<usize> {
        self.labels.view()
    }

    /// Dataset index each position was drawn from, in draw order
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// # Panics
    /// If `pos` is out of bounds
    pub fn image(&self, pos: usize) -> ArrayView3<AdvFloat> {
        self.images.index_axis(Axis(0), pos)
    }

    pub fn image_shape(&self) -> TensorShape {
        TensorShape::from(&self.images.shape()[1..])
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArrayView3<AdvFloat>, usize)> + '_ {
        self.images
            .axis_iter(Axis(0))
            .zip(self.labels.iter().copied())
    }

    pub fn into_parts(self) -> (Array4<AdvFloat>, Array1<usize>) {
        (self.images, self.labels)
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Batch of {} x {} from {:?}",
            self.len(),
            self.image_shape(),
            self.indices
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_iter_pairs_images_with_labels() {
        let images = Array4::from_shape_fn((3, 1, 1, 1), |(n, _, _, _)| n as AdvFloat);
        let batch = Batch::new(images, arr1(&[2, 0, 1]), vec![5, 3, 9]);
        let pairs: Vec<(AdvFloat, usize)> =
            batch.iter().map(|(img, l)| (img[[0, 0, 0]], l)).collect();
        assert_eq!(pairs, vec![(0., 2), (1., 0), (2., 1)]);
        assert_eq!(batch.image_shape(), TensorShape::image(1, 1, 1));
        assert_eq!(format!("{}", batch), "Batch of 3 x (1, 1, 1) from [5, 3, 9]");

        let (images, labels) = batch.into_parts();
        assert_eq!(images.shape(), &[3, 1, 1, 1]);
        assert_eq!(labels, arr1(&[2usize, 0, 1]));
    }

    #[test]
    fn test_serializes_all_parts() {
        let images = Array4::<AdvFloat>::zeros((1, 1, 1, 1));
        let batch = Batch::new(images, arr1(&[4]), vec![2]);
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["labels"]["data"], serde_json::json!([4]));
        assert_eq!(json["indices"], serde_json::json!([2]));
    }
}
