//! Post-processing for single-image object detection
//!
//! The detector itself and any drawing or display live outside this crate. What remains here is
//! the part every caller needs: which pretrained detector to ask for, dropping weak detections,
//! and turning the survivors into labelled, coloured boxes.
use crate::error::DetectionError;
use clap::{Parser, ValueEnum};
use log::info;
use ndarray::ArrayView3;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Pretrained detectors a [`Detector`] may be built from
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorModel {
    #[default]
    FrcnnResnet,
    FrcnnMobilenet,
    Retinanet,
    Maskrcnn,
}

impl DetectorModel {
    pub const ALL: [Self; 4] = [
        Self::FrcnnResnet,
        Self::FrcnnMobilenet,
        Self::Retinanet,
        Self::Maskrcnn,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::FrcnnResnet => "frcnn-resnet",
            Self::FrcnnMobilenet => "frcnn-mobilenet",
            Self::Retinanet => "retinanet",
            Self::Maskrcnn => "maskrcnn",
        }
    }

    /// Architecture the identifier refers to
    pub const fn architecture(self) -> &'static str {
        match self {
            Self::FrcnnResnet => "fasterrcnn_resnet50_fpn",
            Self::FrcnnMobilenet => "fasterrcnn_mobilenet_v3_large_320_fpn",
            Self::Retinanet => "retinanet_resnet50_fpn",
            Self::Maskrcnn => "maskrcnn_resnet50_fpn",
        }
    }
}

impl fmt::Display for DetectorModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DetectorModel {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|model| model.name() == s)
            .ok_or_else(|| DetectionError::UnknownModel {
                name: s.to_string(),
            })
    }
}

/// Command-line surface of the single-image detection tool
///
/// No binary in this crate parses it. A tool embedding a concrete [`Detector`] parses these
/// arguments and hands them to [`run_detection`].
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Detect objects in one image", long_about = None)]
pub struct DetectionArgs {
    /// Path to the input image
    #[arg(short, long, value_name = "FILE")]
    pub image: PathBuf,

    /// Name of the object detection model
    #[arg(short, long, value_enum, default_value_t = DetectorModel::FrcnnResnet)]
    pub model: DetectorModel,

    /// Path to the serialized list of categories
    #[arg(short, long, value_name = "FILE", default_value = "coco_classes.pickle")]
    pub labels: PathBuf,

    /// Minimum probability to keep a detection
    #[arg(short, long, default_value_t = 0.5, value_name = "THRESHOLD")]
    pub confidence: f32,
}

/// One raw detector output
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct Detection {
    /// `[start_x, start_y, end_x, end_y]` in pixels
    pub bbox: [f32; 4],
    pub label: usize,
    pub score: f32,
}

pub trait Detector {
    type Error: Error + Send + Sync + 'static;

    /// Runs one forward pass over a `(height, width, channels)` image scaled to `[0, 1]`
    ///
    /// # Errors
    /// Whenever the detector cannot process the image
    fn detect(&self, image: ArrayView3<f32>) -> Result<Vec<Detection>, Self::Error>;
}

/// Keeps detections scoring strictly above `confidence`, in detector order
pub fn filter_detections(detections: Vec<Detection>, confidence: f32) -> Vec<Detection> {
    detections
        .into_iter()
        .filter(|det| det.score > confidence)
        .collect()
}

/// One RGB colour per class
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClassPalette {
    colors: Vec<[u8; 3]>,
}

impl ClassPalette {
    pub fn new(colors: Vec<[u8; 3]>) -> Self {
        Self { colors }
    }

    /// Channels drawn uniformly from `[0, 255)`
    pub fn random<R: Rng + ?Sized>(classes: usize, rng: &mut R) -> Self {
        let channel = Uniform::new(0f64, 255.);
        let colors = (0..classes)
            .map(|_| {
                let mut color = [0u8; 3];
                for c in &mut color {
                    *c = channel.sample(rng).floor() as u8;
                }
                color
            })
            .collect();
        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn color(&self, label: usize) -> Option<[u8; 3]> {
        self.colors.get(label).copied()
    }
}

/// A detection ready to be drawn
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Annotation {
    /// `[start_x, start_y, end_x, end_y]`, truncated to whole pixels
    pub rect: [i32; 4],
    pub text: String,
    pub color: [u8; 3],
    /// Where the label text starts
    pub text_origin: (i32, i32),
}

pub fn label_text(class: &str, score: f32) -> String {
    format!("{}: {:.2}%", class, score * 100.)
}

/// Puts the label above the box unless that would run off the top of the image
pub const fn label_y(start_y: i32) -> i32 {
    let above = start_y.saturating_sub(15);
    if above > 15 {
        above
    } else {
        start_y.saturating_add(15)
    }
}

/// # Errors
/// `DetectionError::UnknownClass` if a detection names a class missing from `classes` or `palette`
pub fn annotate(
    detections: &[Detection],
    classes: &[String],
    palette: &ClassPalette,
) -> Result<Vec<Annotation>, DetectionError> {
    detections
        .iter()
        .map(|det| {
            let unknown = || DetectionError::UnknownClass {
                label: det.label,
                classes: classes.len(),
            };
            let class = classes.get(det.label).ok_or_else(unknown)?;
            let color = palette.color(det.label).ok_or_else(unknown)?;
            let [start_x, start_y, end_x, end_y] = det.bbox.map(|x| x as i32);
            Ok(Annotation {
                rect: [start_x, start_y, end_x, end_y],
                text: label_text(class, det.score),
                color,
                text_origin: (start_x, label_y(start_y)),
            })
        })
        .collect()
}

/// Detect, drop weak detections and annotate the rest
///
/// # Errors
/// If the detector fails or reports a class outside `classes`
pub fn run_detection<D: Detector + ?Sized>(
    detector: &D,
    image: ArrayView3<f32>,
    classes: &[String],
    confidence: f32,
    palette: &ClassPalette,
) -> Result<Vec<Annotation>, DetectionError> {
    let detections = detector
        .detect(image)
        .map_err(|err| DetectionError::Detector {
            source: Box::new(err),
        })?;
    let kept = filter_detections(detections, confidence);
    let annotations = annotate(&kept, classes, palette)?;
    for annotation in &annotations {
        info!("{}", annotation.text);
    }
    Ok(annotations)
}
