//! Format selection, save/load dispatch and conversion reporting.
//!
//! [`AnnotationFormat`] is the one place format strings are interpreted; an
//! unknown spelling is a hard [`PrelabelError::UnsupportedFormat`]. The
//! conversion report inspects a set before it is written and lists what the
//! target format will lose or reinterpret.

pub mod report;

pub use report::{ConversionCounts, ConversionIssue, ConversionIssueCode, ConversionReport};

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::PrelabelError;
use crate::ir::io_coco_json::{self, basename, COCO_FILE_NAME};
use crate::ir::io_voc_xml;
use crate::ir::{AnnotationSet, IoReport};

/// On-disk annotation formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnnotationFormat {
    /// A single `annotations.json` COCO document.
    Coco,
    /// One PASCAL VOC XML file per image under `Annotations/`.
    PascalVoc,
}

impl AnnotationFormat {
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationFormat::Coco => "coco",
            AnnotationFormat::PascalVoc => "pascal-voc",
        }
    }
}

impl fmt::Display for AnnotationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnnotationFormat {
    type Err = PrelabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coco" | "coco-json" | "coco_json" => Ok(AnnotationFormat::Coco),
            "voc" | "pascal-voc" | "pascal_voc" | "pascal voc" => Ok(AnnotationFormat::PascalVoc),
            _ => Err(PrelabelError::UnsupportedFormat(format!(
                "'{s}' (supported: coco, pascal-voc)"
            ))),
        }
    }
}

/// Writes `set` into `output_dir` in `format`, creating the directory.
///
/// COCO goes to `output_dir/annotations.json`; VOC goes to
/// `output_dir/Annotations/*.xml`. Images whose dimensions cannot be read
/// are skipped and listed in the returned report.
pub fn save_annotations(
    set: &AnnotationSet,
    format: AnnotationFormat,
    output_dir: &Path,
) -> Result<IoReport, PrelabelError> {
    fs::create_dir_all(output_dir)?;
    match format {
        AnnotationFormat::Coco => {
            io_coco_json::write_coco_json(&output_dir.join(COCO_FILE_NAME), set)
        }
        AnnotationFormat::PascalVoc => io_voc_xml::write_voc_dir(output_dir, set),
    }
}

/// Reads annotations from `path` in `format`.
///
/// For COCO, `path` is either the JSON file itself or a directory holding
/// `annotations.json`. For VOC it is the dataset root or the XML directory.
pub fn load_annotations(
    path: &Path,
    format: AnnotationFormat,
) -> Result<(AnnotationSet, IoReport), PrelabelError> {
    match format {
        AnnotationFormat::Coco => {
            let file = coco_file_path(path);
            let set = io_coco_json::read_coco_json(&file)?;
            let report = IoReport {
                processed: set.len(),
                ..IoReport::new()
            };
            Ok((set, report))
        }
        AnnotationFormat::PascalVoc => io_voc_xml::read_voc_dir(path),
    }
}

fn coco_file_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(COCO_FILE_NAME)
    } else {
        path.to_path_buf()
    }
}

/// Describes what writing `set` (read from `from`) as `to` preserves.
pub fn build_conversion_report(
    set: &AnnotationSet,
    from: AnnotationFormat,
    to: AnnotationFormat,
) -> ConversionReport {
    let mut report = ConversionReport::new(from.name(), to.name());
    report.input = ConversionCounts {
        images: set.len(),
        labels: set.labels().len(),
        annotations: set.annotation_count(),
    };
    report.output = report.input.clone();

    match to {
        AnnotationFormat::PascalVoc => analyze_to_voc(set, &mut report),
        AnnotationFormat::Coco => analyze_to_coco(set, &mut report),
    }

    if from == AnnotationFormat::Coco {
        report.add(ConversionIssue::info(
            ConversionIssueCode::CocoReaderKeysByFileName,
            "COCO input is keyed by bare file_name; directory components are not recovered",
        ));
    }

    report
}

fn analyze_to_voc(set: &AnnotationSet, report: &mut ConversionReport) {
    let subpixel = set
        .iter()
        .flat_map(|(_, annotations)| annotations)
        .filter(|ann| ann.bbox.has_subpixel_coords())
        .count();
    if subpixel > 0 {
        report.add(ConversionIssue::warning(
            ConversionIssueCode::VocTruncatesCoordinates,
            format!("{subpixel} box(es) have sub-pixel corners that VOC truncates to integers"),
        ));
    }

    let mut by_file: HashMap<String, Vec<&str>> = HashMap::new();
    for key in set.image_keys() {
        by_file
            .entry(io_voc_xml::xml_file_name(key))
            .or_default()
            .push(key);
    }
    let mut collisions: Vec<(String, Vec<&str>)> = by_file
        .into_iter()
        .filter(|(_, keys)| keys.len() > 1)
        .collect();
    collisions.sort();
    for (file, keys) in collisions {
        report.add(ConversionIssue::warning(
            ConversionIssueCode::VocBasenameCollision,
            format!(
                "{} images share {file}; only the last is kept: {}",
                keys.len(),
                keys.join(", ")
            ),
        ));
    }
    // Each colliding group collapses into one file.
    let distinct_files: HashSet<String> = set.image_keys().map(io_voc_xml::xml_file_name).collect();
    report.output.images = distinct_files.len();
}

fn analyze_to_coco(set: &AnnotationSet, report: &mut ConversionReport) {
    report.add(ConversionIssue::info(
        ConversionIssueCode::CocoWriterRegeneratesIds,
        "image, annotation and category ids are assigned afresh in collection order",
    ));

    let with_dirs = set
        .image_keys()
        .filter(|key| basename(key) != *key)
        .count();
    if with_dirs > 0 {
        report.add(ConversionIssue::info(
            ConversionIssueCode::CocoWriterStoresBasename,
            format!("{with_dirs} image key(s) are written as bare file names"),
        ));
    }
}
