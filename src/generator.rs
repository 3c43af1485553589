//! ## Generator lifecycle
//! 1. Build a `GeneratorConfig` (batch size, image dims, eps, optional seed)
//! 2. Create the `AdversarialBatchGenerator` from a borrowed model and dataset plus an adversary
//! 3. Call `next_batch` (or pull from the iterator) for as many batches as the caller wants
//!
//! Production never ends on its own. Each call samples `total` distinct examples, replaces each
//! one with the adversary's output, and hands the batch back by value. The first failing example
//! aborts the whole call; nothing is retried or skipped.
use crate::adversary::Adversary;
use crate::batch::Batch;
use crate::dataset::Dataset;
use crate::error::{ConfigError, GenerateError, LoadError};
use crate::tensorshape::TensorShape;
use crate::{AdvFloat, DEFAULT_EPS};
use log::{debug, trace};
use ndarray::{Array1, Array4, Axis};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const fn default_eps() -> AdvFloat {
    DEFAULT_EPS
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GeneratorConfig {
    /// Examples per batch
    pub total: usize,
    /// `[height, width, channels]` of one image
    pub dims: TensorShape,
    #[serde(default = "default_eps")]
    pub eps: AdvFloat,
    /// Seeds the sampling RNG; entropy is used when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

impl GeneratorConfig {
    pub fn new<S: Into<TensorShape>>(total: usize, dims: S) -> Self {
        Self {
            total,
            dims: dims.into(),
            eps: DEFAULT_EPS,
            seed: None,
        }
    }

    #[must_use]
    pub fn with_eps(mut self, eps: AdvFloat) -> Self {
        self.eps = eps;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// # Errors
    /// If `s` is not a JSON generator config
    pub fn from_json_str(s: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(s)?)
    }

    /// # Errors
    /// If the file cannot be read or is not a JSON generator config
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Checks everything that can be known without touching image data
    ///
    /// # Errors
    /// If `total` is zero or larger than `available`, eps is negative or not finite, or dims are
    /// not a fully defined `(h, w, c)` shape.
    pub fn validate(&self, available: usize) -> Result<(usize, usize, usize), ConfigError> {
        if self.total == 0 {
            return Err(ConfigError::ZeroTotal);
        }
        if self.total > available {
            return Err(ConfigError::TotalExceedsDataset {
                total: self.total,
                available,
            });
        }
        if !self.eps.is_finite() || self.eps < 0. {
            return Err(ConfigError::InvalidEps { eps: self.eps });
        }
        self.dims.as_image().ok_or_else(|| ConfigError::InvalidDims {
            dims: self.dims.clone(),
        })
    }

    /// Checks `dims` against the images stored in `dataset`
    ///
    /// Rank 3 storage must match exactly; any other storage must hold `h * w * c` elements per
    /// example.
    ///
    /// # Errors
    /// `ConfigError::DimsMismatch` when the two disagree
    pub fn check_dims(&self, dataset: &Dataset) -> Result<(), ConfigError> {
        let stored = dataset.image_shape();
        let matches = if stored.rank() == 3 {
            stored == self.dims
        } else {
            self.dims.is_fully_defined() && dataset.image_len() == self.dims.dims()
        };
        if matches {
            Ok(())
        } else {
            Err(ConfigError::DimsMismatch {
                dims: self.dims.clone(),
                stored,
            })
        }
    }
}

/// Infinite, pull-based producer of adversarial batches
///
/// The model and dataset are borrowed for the generator's lifetime and never mutated. The RNG is
/// owned and advanced once per batch.
pub struct AdversarialBatchGenerator<'a, M: ?Sized, A, R = StdRng> {
    model: &'a M,
    dataset: &'a Dataset,
    adversary: A,
    config: GeneratorConfig,
    dims: (usize, usize, usize),
    rng: R,
    batches_produced: usize,
}

impl<'a, M: ?Sized, A: Adversary<M>> AdversarialBatchGenerator<'a, M, A, StdRng> {
    /// Uses `config.seed` when present, otherwise seeds from OS entropy
    ///
    /// # Errors
    /// See [`GeneratorConfig::validate`]
    pub fn new(
        model: &'a M,
        dataset: &'a Dataset,
        adversary: A,
        config: GeneratorConfig,
    ) -> Result<Self, ConfigError> {
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self::with_rng(model, dataset, adversary, config, rng)
    }
}

impl<'a, M: ?Sized, A: Adversary<M>, R: Rng> AdversarialBatchGenerator<'a, M, A, R> {
    /// # Errors
    /// See [`GeneratorConfig::validate`]
    pub fn with_rng(
        model: &'a M,
        dataset: &'a Dataset,
        adversary: A,
        config: GeneratorConfig,
        rng: R,
    ) -> Result<Self, ConfigError> {
        let dims = config.validate(dataset.len())?;
        Ok(Self {
            model,
            dataset,
            adversary,
            config,
            dims,
            rng,
            batches_produced: 0,
        })
    }

    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Number of batches successfully handed out so far
    pub const fn batches_produced(&self) -> usize {
        self.batches_produced
    }

    /// Assembles one batch of `total` adversarial examples
    ///
    /// # Errors
    /// * `GenerateError::Config` if `dims` disagree with the stored images
    /// * `GenerateError::Attack` if the adversary fails on any sampled example
    /// * `GenerateError::Shape` if the adversary changes the image shape
    pub fn next_batch(&mut self) -> Result<Batch, GenerateError> {
        self.config.check_dims(self.dataset)?;
        let (h, w, c) = self.dims;
        let total = self.config.total;
        let eps = self.config.eps;

        let indices = index::sample(&mut self.rng, self.dataset.len(), total).into_vec();
        let mut images = Array4::<AdvFloat>::zeros((total, h, w, c));
        let mut labels = Array1::<usize>::zeros(total);

        for (pos, &index) in indices.iter().enumerate() {
            let image = self.dataset.batched_image(index, self.dims).map_err(|_| {
                ConfigError::DimsMismatch {
                    dims: self.config.dims.clone(),
                    stored: self.dataset.image_shape(),
                }
            })?;
            let label = self.dataset.labels()[index];
            trace!("attacking example {} (label {}) at position {}", index, label, pos);

            let adversary = self
                .adversary
                .perturb(self.model, image.view(), label, eps)
                .map_err(|err| GenerateError::Attack {
                    index,
                    source: Box::new(err),
                })?;
            if adversary.shape() != image.shape() {
                return Err(GenerateError::Shape {
                    index,
                    expected: TensorShape::from(image.shape()),
                    given: TensorShape::from(adversary.shape()),
                });
            }

            images
                .index_axis_mut(Axis(0), pos)
                .assign(&adversary.index_axis(Axis(0), 0));
            labels[pos] = label;
        }

        self.batches_produced += 1;
        debug!(
            "batch {} assembled from indices {:?}",
            self.batches_produced, indices
        );
        Ok(Batch::new(images, labels, indices))
    }
}

impl<'a, M: ?Sized, A, R> Display for AdversarialBatchGenerator<'a, M, A, R> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(
            f,
            "AdversarialBatchGenerator(total: {}, dims: {}, eps: {}, produced: {})",
            self.config.total, self.config.dims, self.config.eps, self.batches_produced
        )
    }
}

impl<'a, M: ?Sized, A: Adversary<M>, R: Rng> Iterator for AdversarialBatchGenerator<'a, M, A, R> {
    type Item = Result<Batch, GenerateError>;

    /// Never returns `None`
    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_batch())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}
