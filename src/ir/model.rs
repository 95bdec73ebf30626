//! Core annotation model.
//!
//! Every reader converts into an [`AnnotationSet`] and every writer converts
//! from one. The set maps an image key (the file path the caller used) to the
//! ordered list of boxes on that image.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::bbox::BBox;

/// Score carried by manually created annotations.
pub const MANUAL_SCORE: f64 = 1.0;

/// One detected or manually drawn object instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Bounding box in pixel coordinates (XYXY format).
    pub bbox: BBox,

    /// Free-form object label (e.g., "person", "red car").
    pub label: String,

    /// Confidence in `[0, 1]`; manual annotations carry 1.0.
    #[serde(default = "default_score")]
    pub score: f64,
}

fn default_score() -> f64 {
    MANUAL_SCORE
}

/// True when `score` is a finite confidence in `[0, 1]`.
pub fn is_valid_score(score: f64) -> bool {
    (0.0..=1.0).contains(&score)
}

impl Annotation {
    /// Creates a manual annotation (score 1.0).
    pub fn new(bbox: BBox, label: impl Into<String>) -> Self {
        Self {
            bbox,
            label: label.into(),
            score: MANUAL_SCORE,
        }
    }

    /// Sets the confidence score.
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }
}

/// Ordered mapping from image key to that image's annotations.
///
/// Insertion order is preserved: it is the order images are exported in and
/// the order annotations are indexed by the editor. A key present in the set
/// always maps to a (possibly empty) list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationSet {
    images: IndexMap<String, Vec<Annotation>>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the annotations for `image`, keeping its original position
    /// if the key already exists. Returns the previous list, if any.
    pub fn insert(
        &mut self,
        image: impl Into<String>,
        annotations: Vec<Annotation>,
    ) -> Option<Vec<Annotation>> {
        self.images.insert(image.into(), annotations)
    }

    /// Appends annotations to `image`, creating the entry if needed.
    pub fn extend_image(&mut self, image: impl Into<String>, annotations: Vec<Annotation>) {
        self.images
            .entry(image.into())
            .or_default()
            .extend(annotations);
    }

    pub fn get(&self, image: &str) -> Option<&[Annotation]> {
        self.images.get(image).map(Vec::as_slice)
    }

    pub fn get_mut(&mut self, image: &str) -> Option<&mut Vec<Annotation>> {
        self.images.get_mut(image)
    }

    pub fn contains(&self, image: &str) -> bool {
        self.images.contains_key(image)
    }

    /// Removes an image while keeping the order of the remaining entries.
    pub fn remove(&mut self, image: &str) -> Option<Vec<Annotation>> {
        self.images.shift_remove(image)
    }

    /// Iterates `(image key, annotations)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Annotation])> {
        self.images
            .iter()
            .map(|(key, anns)| (key.as_str(), anns.as_slice()))
    }

    pub fn image_keys(&self) -> impl Iterator<Item = &str> {
        self.images.keys().map(String::as_str)
    }

    /// Number of images.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Total number of annotations across all images.
    pub fn annotation_count(&self) -> usize {
        self.images.values().map(Vec::len).sum()
    }

    /// Distinct labels in first-seen order.
    pub fn labels(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for ann in self.images.values().flatten() {
            if !seen.contains(&ann.label.as_str()) {
                seen.push(&ann.label);
            }
        }
        seen
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<Annotation>)> for AnnotationSet {
    fn from_iter<T: IntoIterator<Item = (K, Vec<Annotation>)>>(iter: T) -> Self {
        let mut set = AnnotationSet::new();
        for (key, anns) in iter {
            set.insert(key, anns);
        }
        set
    }
}

impl IntoIterator for AnnotationSet {
    type Item = (String, Vec<Annotation>);
    type IntoIter = indexmap::map::IntoIter<String, Vec<Annotation>>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.into_iter()
    }
}
