//! Zero-shot detector contract and output adapter.
//!
//! The detector itself lives outside this crate. It is called with an image,
//! a comma-separated text prompt and two thresholds, and answers with three
//! index-aligned sequences: boxes `[x1, y1, x2, y2]` in pixels, scores and
//! labels. Thresholding happens inside the detector; the adapter keeps
//! whatever it returns.

mod command;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PrelabelError;
use crate::ir::{is_valid_score, Annotation, BBox};

pub use command::CommandDetector;

pub const DEFAULT_PROMPT: &str = "person, car, dog, cat";
pub const DEFAULT_BOX_THRESHOLD: f64 = 0.35;
pub const DEFAULT_TEXT_THRESHOLD: f64 = 0.25;

/// Parameters forwarded to the detector.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionRequest {
    prompt: String,
    box_threshold: f64,
    text_threshold: f64,
}

impl DetectionRequest {
    /// Validates both thresholds lie strictly inside `(0, 1)`.
    pub fn new(
        prompt: impl Into<String>,
        box_threshold: f64,
        text_threshold: f64,
    ) -> Result<Self, PrelabelError> {
        check_threshold("box threshold", box_threshold)?;
        check_threshold("text threshold", text_threshold)?;
        Ok(Self {
            prompt: prompt.into(),
            box_threshold,
            text_threshold,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Prompt split on commas, trimmed, empty entries dropped.
    pub fn prompt_labels(&self) -> Vec<&str> {
        self.prompt
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .collect()
    }

    pub fn box_threshold(&self) -> f64 {
        self.box_threshold
    }

    pub fn text_threshold(&self) -> f64 {
        self.text_threshold
    }
}

impl Default for DetectionRequest {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            box_threshold: DEFAULT_BOX_THRESHOLD,
            text_threshold: DEFAULT_TEXT_THRESHOLD,
        }
    }
}

fn check_threshold(name: &'static str, value: f64) -> Result<(), PrelabelError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(PrelabelError::InvalidThreshold { name, value })
    }
}

/// Raw detector output: three index-aligned sequences.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Detections {
    pub boxes: Vec<[f64; 4]>,
    pub scores: Vec<f64>,
    pub labels: Vec<String>,
}

impl Detections {
    /// Zips the three sequences into annotations, validating each entry.
    pub fn into_annotations(self) -> Result<Vec<Annotation>, PrelabelError> {
        let Detections {
            boxes,
            scores,
            labels,
        } = self;

        if boxes.len() != scores.len() || boxes.len() != labels.len() {
            return Err(PrelabelError::InvalidDetections(format!(
                "sequence lengths differ: {} boxes, {} scores, {} labels",
                boxes.len(),
                scores.len(),
                labels.len()
            )));
        }

        boxes
            .into_iter()
            .zip(scores)
            .zip(labels)
            .enumerate()
            .map(|(index, ((corners, score), label))| {
                let bbox = BBox::from(corners);
                if !bbox.is_finite() {
                    return Err(PrelabelError::InvalidDetections(format!(
                        "detection {index} has non-finite coordinates {corners:?}"
                    )));
                }
                if !is_valid_score(score) {
                    return Err(PrelabelError::InvalidDetections(format!(
                        "detection {index} has score {score} outside [0, 1]"
                    )));
                }
                if label.trim().is_empty() {
                    return Err(PrelabelError::InvalidDetections(format!(
                        "detection {index} has an empty label"
                    )));
                }
                Ok(Annotation { bbox, label, score })
            })
            .collect()
    }
}

/// A zero-shot object detector.
pub trait Detector {
    fn predict(
        &mut self,
        image: &Path,
        request: &DetectionRequest,
    ) -> Result<Detections, PrelabelError>;
}

impl<F> Detector for F
where
    F: FnMut(&Path, &DetectionRequest) -> Result<Detections, PrelabelError>,
{
    fn predict(
        &mut self,
        image: &Path,
        request: &DetectionRequest,
    ) -> Result<Detections, PrelabelError> {
        self(image, request)
    }
}

/// Runs the detector on one image and adapts its output.
pub fn detect_annotations<D: Detector + ?Sized>(
    detector: &mut D,
    image: &Path,
    request: &DetectionRequest,
) -> Result<Vec<Annotation>, PrelabelError> {
    log::debug!(
        "detecting '{}' in {} (box {}, text {})",
        request.prompt(),
        image.display(),
        request.box_threshold(),
        request.text_threshold()
    );
    detector.predict(image, request)?.into_annotations()
}
