#![allow(clippy::must_use_candidate, clippy::module_name_repetitions)]
//! Randomized adversarial batch generation.
//!
//! The core is [`generator::AdversarialBatchGenerator`], an infinite iterator that samples
//! examples from a [`dataset::Dataset`] without replacement and swaps each one for an
//! adversarial counterpart produced by an [`adversary::Adversary`] (FGSM by default).
extern crate ndarray;
extern crate ndarray_rand;
extern crate ndarray_stats;
extern crate num;
extern crate rand;

pub mod adversary;
pub mod affine;
pub mod batch;
pub mod classifier;
pub mod dataset;
pub mod detection;
pub mod error;
pub mod fgsm;
pub mod generator;
pub mod logging;
pub mod tensorshape;
mod test_util;

pub use adversary::{from_fn, Adversary, Identity};
pub use batch::Batch;
pub use classifier::SoftmaxClassifier;
pub use dataset::Dataset;
pub use error::{
    ConfigError, DatasetError, DetectionError, GenerateError, LoadError, ModelError,
};
pub use fgsm::{Fgsm, LossGradient};
pub use generator::{AdversarialBatchGenerator, GeneratorConfig};
pub use tensorshape::TensorShape;

pub type AdvFloat = f64;

/// Perturbation magnitude used when a configuration does not name one
pub const DEFAULT_EPS: AdvFloat = 0.01;
