//! Box overlays for visual inspection.
//!
//! Colours are kept per label in a [`LabelPalette`] owned by the caller, so
//! two rendering sessions never share or disturb each other's colours.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};
use rand::{rngs::StdRng, RngExt, SeedableRng};

use crate::error::PrelabelError;
use crate::ir::Annotation;

pub const DEFAULT_THICKNESS: u32 = 2;

/// Label to colour assignments, generated on first use.
#[derive(Debug)]
pub struct LabelPalette {
    colors: HashMap<String, Rgb<u8>>,
    rng: StdRng,
}

impl LabelPalette {
    pub fn new() -> Self {
        let seed = rand::rng().random_range(0..u64::MAX);
        Self::with_seed(seed)
    }

    /// Palette whose colour sequence is reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            colors: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns the colour of `label`, drawing a new random one the first time.
    pub fn color_for(&mut self, label: &str) -> Rgb<u8> {
        if let Some(color) = self.colors.get(label) {
            return *color;
        }
        let color = Rgb([
            self.rng.random_range(0..=255),
            self.rng.random_range(0..=255),
            self.rng.random_range(0..=255),
        ]);
        self.colors.insert(label.to_string(), color);
        color
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for LabelPalette {
    fn default() -> Self {
        Self::new()
    }
}

/// Draws every annotation's box outline onto `canvas`.
///
/// Corners are truncated to whole pixels and clipped to the canvas; the
/// outline grows inwards by `thickness` pixels.
pub fn draw_annotations(
    canvas: &mut RgbImage,
    annotations: &[Annotation],
    palette: &mut LabelPalette,
    thickness: u32,
) {
    for annotation in annotations {
        let color = palette.color_for(&annotation.label);
        let [x1, y1, x2, y2] = annotation.bbox.truncated();
        for inset in 0..i64::from(thickness.max(1)) {
            draw_rectangle(
                canvas,
                (x1 + inset, y1 + inset),
                (x2 - inset, y2 - inset),
                color,
            );
        }
    }
}

fn draw_rectangle(
    canvas: &mut RgbImage,
    top_left: (i64, i64),
    bottom_right: (i64, i64),
    color: Rgb<u8>,
) {
    let (x1, y1) = top_left;
    let (x2, y2) = bottom_right;
    if x1 > x2 || y1 > y2 {
        return;
    }
    for x in x1..=x2 {
        put_clipped(canvas, x, y1, color);
        put_clipped(canvas, x, y2, color);
    }
    for y in y1..=y2 {
        put_clipped(canvas, x1, y, color);
        put_clipped(canvas, x2, y, color);
    }
}

fn put_clipped(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
        return;
    };
    if x < canvas.width() && y < canvas.height() {
        canvas.put_pixel(x, y, color);
    }
}

/// Loads `image`, draws `annotations` on it and saves the result to `output`.
///
/// The output encoding follows the extension of `output`; missing parent
/// directories are created.
pub fn render_overlay(
    image: &Path,
    annotations: &[Annotation],
    palette: &mut LabelPalette,
    output: &Path,
) -> Result<(), PrelabelError> {
    let mut canvas = image::open(image)
        .map_err(|source| PrelabelError::ImageRender {
            path: image.to_path_buf(),
            source,
        })?
        .to_rgb8();

    draw_annotations(&mut canvas, annotations, palette, DEFAULT_THICKNESS);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    canvas
        .save(output)
        .map_err(|source| PrelabelError::ImageRender {
            path: output.to_path_buf(),
            source,
        })?;

    log::info!("wrote overlay {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::BBox;

    #[test]
    fn palette_is_stable_per_label() {
        let mut palette = LabelPalette::with_seed(7);
        let cat = palette.color_for("cat");
        let dog = palette.color_for("dog");
        assert_eq!(palette.color_for("cat"), cat);
        assert_eq!(palette.color_for("dog"), dog);
        assert_eq!(palette.len(), 2);
    }

    #[test]
    fn separate_palettes_do_not_share_state() {
        let mut first = LabelPalette::with_seed(1);
        let mut second = LabelPalette::with_seed(1);
        first.color_for("cat");
        assert!(second.is_empty());
        assert_eq!(second.color_for("cat"), first.color_for("cat"));
    }

    #[test]
    fn draws_outline_only() {
        let mut canvas = RgbImage::new(20, 20);
        let mut palette = LabelPalette::with_seed(3);
        let color = palette.color_for("box");
        let annotations = vec![Annotation::new(BBox::from_xyxy(2.0, 2.0, 12.0, 12.0), "box")];

        draw_annotations(&mut canvas, &annotations, &mut palette, 1);

        assert_eq!(*canvas.get_pixel(2, 2), color);
        assert_eq!(*canvas.get_pixel(12, 7), color);
        assert_eq!(*canvas.get_pixel(7, 7), Rgb([0, 0, 0]));
    }

    #[test]
    fn boxes_past_the_edge_are_clipped() {
        let mut canvas = RgbImage::new(10, 10);
        let mut palette = LabelPalette::with_seed(3);
        let annotations = vec![Annotation::new(BBox::from_xyxy(-5.0, -5.0, 50.0, 50.0), "big")];
        draw_annotations(&mut canvas, &annotations, &mut palette, 3);
        assert_eq!(*canvas.get_pixel(5, 5), Rgb([0, 0, 0]));
    }
}
