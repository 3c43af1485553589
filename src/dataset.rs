//! In-memory image datasets
use crate::error::DatasetError;
use crate::tensorshape::TensorShape;
use crate::AdvFloat;
use ndarray::{
    stack, Array, Array1, Array3, Array4, ArrayD, ArrayView1, ArrayViewD, Axis, Dimension,
    ShapeError,
};

/// N images paired positionally with N class labels
///
/// Images live in a single array whose first axis indexes examples. The remaining axes are
/// either already `(height, width, channels)` or any layout holding `height * width * channels`
/// elements per example (e.g. flattened rows).
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    images: ArrayD<AdvFloat>,
    labels: Array1<usize>,
}

impl Dataset {
    /// # Errors
    /// If the image array has no example axis or the number of images and labels differ.
    pub fn new<D: Dimension>(
        images: Array<AdvFloat, D>,
        labels: Array1<usize>,
    ) -> Result<Self, DatasetError> {
        if images.ndim() == 0 {
            return Err(DatasetError::MissingExampleAxis);
        }
        let n_images = images.len_of(Axis(0));
        if n_images != labels.len() {
            return Err(DatasetError::LengthMismatch {
                images: n_images,
                labels: labels.len(),
            });
        }
        Ok(Self {
            images: images.into_dyn(),
            labels,
        })
    }

    /// Stacks individual `(height, width, channels)` images into a dataset
    ///
    /// # Errors
    /// If `images` is empty, the images differ in shape, or the label count differs.
    pub fn from_examples(
        images: &[Array3<AdvFloat>],
        labels: Vec<usize>,
    ) -> Result<Self, DatasetError> {
        let first = images.first().ok_or(DatasetError::NoExamples)?;
        if let Some((index, image)) = images
            .iter()
            .enumerate()
            .find(|(_, image)| image.shape() != first.shape())
        {
            return Err(DatasetError::InconsistentShape {
                index,
                expected: TensorShape::from(first.shape()),
                given: TensorShape::from(image.shape()),
            });
        }
        let views: Vec<_> = images.iter().map(|image| image.view()).collect();
        let stacked = stack(Axis(0), &views).map_err(|_| DatasetError::NoExamples)?;
        Self::new(stacked, Array1::from(labels))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> ArrayView1<usize> {
        self.labels.view()
    }

    pub fn label(&self, index: usize) -> Option<usize> {
        self.labels.get(index).copied()
    }

    pub fn images(&self) -> ArrayViewD<AdvFloat> {
        self.images.view()
    }

    /// # Panics
    /// If `index` is out of bounds
    pub fn image(&self, index: usize) -> ArrayViewD<AdvFloat> {
        self.images.index_axis(Axis(0), index)
    }

    /// Shape of one stored example (every axis but the first)
    pub fn image_shape(&self) -> TensorShape {
        TensorShape::from(&self.images.shape()[1..])
    }

    /// Number of scalars in one stored example
    pub fn image_len(&self) -> usize {
        self.images.shape()[1..].iter().product()
    }

    /// Returns the example at `index` as a single-example batch of shape `(1, h, w, c)`
    ///
    /// Elements are read in logical (row-major) order, so any stored layout holding
    /// `h * w * c` elements per example is accepted.
    ///
    /// # Errors
    /// If `(h, w, c)` does not hold [`Dataset::image_len`] elements
    ///
    /// # Panics
    /// If `index` is out of bounds
    pub fn batched_image(
        &self,
        index: usize,
        (h, w, c): (usize, usize, usize),
    ) -> Result<Array4<AdvFloat>, ShapeError> {
        let image = self.image(index);
        Array4::from_shape_vec((1, h, w, c), image.iter().copied().collect())
    }
}
