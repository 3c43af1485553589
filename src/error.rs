//! Error types for datasets, models, batch generation and detection post-processing
use crate::tensorshape::TensorShape;
use crate::AdvFloat;
use std::error::Error as StdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("image array has no example axis")]
    MissingExampleAxis,
    #[error("{images} images but {labels} labels")]
    LengthMismatch { images: usize, labels: usize },
    #[error("cannot stack an empty list of images")]
    NoExamples,
    #[error("example {index} has shape {given}, expected {expected}")]
    InconsistentShape {
        index: usize,
        expected: TensorShape,
        given: TensorShape,
    },
}

/// Problems with a generator configuration. These are raised before any sampling or attack work.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("batch size must be positive")]
    ZeroTotal,
    #[error("cannot draw {total} distinct examples from a dataset of {available}")]
    TotalExceedsDataset { total: usize, available: usize },
    #[error("perturbation magnitude must be finite and non-negative, got {eps}")]
    InvalidEps { eps: AdvFloat },
    #[error("dims {dims} are not a fully defined (height, width, channels) shape")]
    InvalidDims { dims: TensorShape },
    #[error("dims {dims} do not match stored images of shape {stored}")]
    DimsMismatch {
        dims: TensorShape,
        stored: TensorShape,
    },
}

/// Failure to read a configuration file
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read configuration")]
    Io(#[from] std::io::Error),
    #[error("malformed configuration")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("adversary returned shape {given} for example {index}, expected {expected}")]
    Shape {
        index: usize,
        expected: TensorShape,
        given: TensorShape,
    },
    #[error("adversary failed on example {index}")]
    Attack {
        index: usize,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("model expects input shape {expected}, got {given}")]
    Shape {
        expected: TensorShape,
        given: TensorShape,
    },
    #[error("label {label} is out of range for {classes} classes")]
    LabelOutOfRange { label: usize, classes: usize },
    #[error("model produced non-finite outputs")]
    NonFinite,
}

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("detection label {label} is out of range for {classes} classes")]
    UnknownClass { label: usize, classes: usize },
    #[error("unknown detector model {name:?}")]
    UnknownModel { name: String },
    #[error("detector failed")]
    Detector {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}
