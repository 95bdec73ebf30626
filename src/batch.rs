//! Image discovery and the sequential batch-annotation loop.
//!
//! Every image is processed independently: an image that cannot be opened or
//! a detector call that fails is recorded as a skip and the loop moves on.
//! Nothing already collected is discarded and nothing is retried.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::detection::{detect_annotations, DetectionRequest, Detector};
use crate::error::PrelabelError;
use crate::ir::{read_image_dimensions, AnnotationSet, IoReport};
use crate::render::{render_overlay, LabelPalette};

pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Subdirectory of the output directory that receives overlays.
pub const VISUALIZATIONS_DIR: &str = "visualizations";

/// Lists the images to annotate.
///
/// A file input is returned as-is regardless of its extension. A directory is
/// scanned non-recursively for supported image extensions (case-insensitive)
/// and the result is sorted by path.
pub fn collect_images(input: &Path) -> Result<Vec<PathBuf>, PrelabelError> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(PrelabelError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input not found: {}", input.display()),
        )));
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(input).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() && has_image_extension(entry.path()) {
            images.push(entry.into_path());
        }
    }
    images.sort();

    Ok(images)
}

fn has_image_extension(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    IMAGE_EXTENSIONS
        .iter()
        .any(|allowed| ext.eq_ignore_ascii_case(allowed))
}

/// Output path of the overlay for `image` inside `dir`: `vis_<basename>`.
pub fn visualization_path(dir: &Path, image: &Path) -> PathBuf {
    let name = image
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.join(format!("vis_{name}"))
}

/// Runs the detector over every image and collects the results.
///
/// Images are keyed by their path as given. When `visualize_dir` is set, an
/// overlay is written for each annotated image; a failed overlay is logged
/// but does not drop the image's annotations.
pub fn annotate_images<D: Detector + ?Sized>(
    detector: &mut D,
    images: &[PathBuf],
    request: &DetectionRequest,
    visualize_dir: Option<&Path>,
) -> (AnnotationSet, IoReport) {
    let mut set = AnnotationSet::new();
    let mut report = IoReport::new();
    let mut palette = LabelPalette::new();

    for (position, image) in images.iter().enumerate() {
        let key = image.to_string_lossy().into_owned();
        log::info!("[{}/{}] {}", position + 1, images.len(), key);

        if let Err(err) = read_image_dimensions(image) {
            report.record_skip(key, err);
            continue;
        }

        let annotations = match detect_annotations(detector, image, request) {
            Ok(annotations) => annotations,
            Err(err) => {
                report.record_skip(key, err);
                continue;
            }
        };

        if let Some(dir) = visualize_dir {
            let output = visualization_path(dir, image);
            if let Err(err) = render_overlay(image, &annotations, &mut palette, &output) {
                log::warn!("visualization for {key} not written: {err}");
            }
        }

        log::info!("{key}: {} detection(s)", annotations.len());
        set.insert(key, annotations);
        report.record_processed();
    }

    (set, report)
}
