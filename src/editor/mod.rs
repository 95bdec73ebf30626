//! Interactive editing of one image's annotations.
//!
//! The editor owns the ordered annotation list for the image currently being
//! viewed plus an optional selection. Every index-taking operation reports a
//! bad index through its return value (`false` / `None`) and never errors, so
//! a UI can drive it from stale gesture state without guarding each call.

pub mod ops;

use std::fmt;
use std::str::FromStr;

use crate::ir::{Annotation, BBox, MANUAL_SCORE};

pub use ops::{EditOp, EditOutcome};

/// One side of a bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

impl FromStr for Edge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top" => Ok(Edge::Top),
            "bottom" => Ok(Edge::Bottom),
            "left" => Ok(Edge::Left),
            "right" => Ok(Edge::Right),
            other => Err(format!(
                "unknown edge '{other}' (expected top, bottom, left or right)"
            )),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Edge::Top => "top",
            Edge::Bottom => "bottom",
            Edge::Left => "left",
            Edge::Right => "right",
        };
        f.write_str(name)
    }
}

/// Partial update for [`AnnotationEditor::update_annotation`]; `None` fields
/// are left untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotationUpdate {
    pub bbox: Option<BBox>,
    pub label: Option<String>,
    pub score: Option<f64>,
}

impl AnnotationUpdate {
    pub fn bbox(bbox: BBox) -> Self {
        Self {
            bbox: Some(bbox),
            ..Default::default()
        }
    }

    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn score(score: f64) -> Self {
        Self {
            score: Some(score),
            ..Default::default()
        }
    }
}

/// Editing state for a single image.
#[derive(Clone, Debug)]
pub struct AnnotationEditor {
    image_key: String,
    width: u32,
    height: u32,
    annotations: Vec<Annotation>,
    selected: Option<usize>,
}

impl AnnotationEditor {
    /// Creates an empty editor for an image of the given pixel size.
    pub fn new(image_key: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            image_key: image_key.into(),
            width,
            height,
            annotations: Vec::new(),
            selected: None,
        }
    }

    pub fn image_key(&self) -> &str {
        &self.image_key
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Replaces the whole list and clears the selection.
    pub fn set_annotations(&mut self, annotations: Vec<Annotation>) {
        self.annotations = annotations;
        self.selected = None;
    }

    /// Appends an annotation and returns its index. The box is stored as given.
    pub fn add_annotation(&mut self, bbox: BBox, label: impl Into<String>, score: f64) -> usize {
        self.annotations.push(Annotation {
            bbox,
            label: label.into(),
            score,
        });
        self.annotations.len() - 1
    }

    /// Appends a manual annotation (score 1.0).
    pub fn add_manual_annotation(&mut self, bbox: BBox, label: impl Into<String>) -> usize {
        self.add_annotation(bbox, label, MANUAL_SCORE)
    }

    /// Applies the provided fields to the annotation at `index`.
    pub fn update_annotation(&mut self, index: usize, update: AnnotationUpdate) -> bool {
        let Some(annotation) = self.annotations.get_mut(index) else {
            return false;
        };

        if let Some(bbox) = update.bbox {
            annotation.bbox = bbox;
        }
        if let Some(label) = update.label {
            annotation.label = label;
        }
        if let Some(score) = update.score {
            annotation.score = score;
        }
        true
    }

    /// Removes the annotation at `index`, keeping the selection on the same
    /// logical annotation when it shifts down.
    pub fn delete_annotation(&mut self, index: usize) -> bool {
        if index >= self.annotations.len() {
            return false;
        }

        self.annotations.remove(index);

        self.selected = match self.selected {
            Some(selected) if selected == index => None,
            Some(selected) if selected > index => Some(selected - 1),
            other => other,
        };
        true
    }

    /// Selects the smallest-area box containing `(x, y)`, edges inclusive.
    ///
    /// Ties keep the lowest index. Clears the selection when nothing is hit.
    pub fn select_annotation(&mut self, x: f64, y: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;

        for (index, annotation) in self.annotations.iter().enumerate() {
            if !annotation.bbox.contains(x, y) {
                continue;
            }
            let area = annotation.bbox.area();
            if best.map_or(true, |(_, min_area)| area < min_area) {
                best = Some((index, area));
            }
        }

        self.selected = best.map(|(index, _)| index);
        self.selected
    }

    /// Sets or clears the selection by index. Out-of-range indices clear it.
    pub fn select_index(&mut self, index: Option<usize>) -> Option<usize> {
        self.selected = index.filter(|&i| i < self.annotations.len());
        self.selected
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn get_selected_annotation(&self) -> Option<&Annotation> {
        self.selected.and_then(|index| self.annotations.get(index))
    }

    /// Translates a box by `(dx, dy)`, clamping each coordinate into the image.
    ///
    /// Clamping is per coordinate, so a box pushed against a border can
    /// collapse to zero width or height.
    pub fn move_annotation(&mut self, index: usize, dx: f64, dy: f64) -> bool {
        let (max_x, max_y) = self.max_coords();
        let Some(annotation) = self.annotations.get_mut(index) else {
            return false;
        };

        let bbox = &mut annotation.bbox;
        bbox.x1 = clamp_coord(bbox.x1 + dx, max_x);
        bbox.y1 = clamp_coord(bbox.y1 + dy, max_y);
        bbox.x2 = clamp_coord(bbox.x2 + dx, max_x);
        bbox.y2 = clamp_coord(bbox.y2 + dy, max_y);
        true
    }

    /// Moves one edge of a box, then clamps so the box stays inside the image
    /// with `x1 < x2` and `y1 < y2`.
    pub fn resize_annotation(&mut self, index: usize, edge: Edge, dx: f64, dy: f64) -> bool {
        let (max_x, max_y) = self.max_coords();
        let Some(annotation) = self.annotations.get_mut(index) else {
            return false;
        };

        let bbox = &mut annotation.bbox;
        match edge {
            Edge::Top => bbox.y1 += dy,
            Edge::Bottom => bbox.y2 += dy,
            Edge::Left => bbox.x1 += dx,
            Edge::Right => bbox.x2 += dx,
        }

        // x1/y1 clamp against the opposite edge first; x2/y2 then re-clamp
        // against the new x1/y1.
        bbox.x1 = bbox.x1.min(bbox.x2 - 1.0).min(max_x).max(0.0);
        bbox.y1 = bbox.y1.min(bbox.y2 - 1.0).min(max_y).max(0.0);
        bbox.x2 = bbox.x2.min(max_x).max(bbox.x1 + 1.0);
        bbox.y2 = bbox.y2.min(max_y).max(bbox.y1 + 1.0);
        true
    }

    /// Like [`resize_annotation`](Self::resize_annotation) but takes the edge
    /// by name; unknown names fail the same way a bad index does.
    pub fn resize_annotation_by_name(&mut self, index: usize, edge: &str, dx: f64, dy: f64) -> bool {
        match edge.parse::<Edge>() {
            Ok(edge) => self.resize_annotation(index, edge, dx, dy),
            Err(_) => false,
        }
    }

    pub fn get_annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Hands the edited list back to the owner of the collection.
    pub fn into_annotations(self) -> Vec<Annotation> {
        self.annotations
    }

    fn max_coords(&self) -> (f64, f64) {
        (
            f64::from(self.width) - 1.0,
            f64::from(self.height) - 1.0,
        )
    }
}

fn clamp_coord(value: f64, max: f64) -> f64 {
    value.min(max).max(0.0)
}
