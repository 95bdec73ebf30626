//! COCO JSON format reader and writer.
//!
//! # COCO Format Reference
//!
//! COCO bounding boxes use `[x, y, width, height]` format where:
//! - `(x, y)` is the top-left corner in absolute pixel coordinates
//! - `width` and `height` are the dimensions
//!
//! The annotation model uses corner form `[x1, y1, x2, y2]`, so both
//! directions convert.
//!
//! # Identity policy
//!
//! Image, annotation and category ids are regenerated on every export:
//! images are numbered by their position in the set, annotations are numbered
//! across the whole document, and categories are numbered by first-seen label.
//! None of these ids survive a round trip. The reader keys its output by the
//! COCO `file_name` (a bare file name), not by the path the writer was given.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::model::{is_valid_score, Annotation, AnnotationSet, MANUAL_SCORE};
use super::probe::read_image_dimensions;
use super::report::IoReport;
use super::BBox;
use crate::error::PrelabelError;

/// File name of the COCO document inside an output directory.
pub const COCO_FILE_NAME: &str = "annotations.json";

const INFO_DESCRIPTION: &str = "Dataset created with prelabel";
const UNKNOWN_LICENSE_ID: u64 = 1;

// ============================================================================
// COCO Schema Types (internal to this module)
// ============================================================================

/// Document as written. `info` and `licenses` carry placeholder content.
#[derive(Debug, Serialize)]
struct CocoDocument {
    info: CocoInfo,
    licenses: Vec<CocoLicense>,
    images: Vec<CocoImage>,
    annotations: Vec<CocoAnnotation>,
    categories: Vec<CocoCategory>,
}

/// Document as read. Header blocks have no bearing on import and are ignored.
#[derive(Debug, Deserialize)]
struct CocoInput {
    images: Vec<CocoImage>,

    #[serde(default)]
    annotations: Vec<CocoAnnotation>,

    #[serde(default)]
    categories: Vec<CocoCategory>,
}

#[derive(Debug, Serialize)]
struct CocoInfo {
    description: String,
    url: String,
    version: String,
    year: i32,
    contributor: String,
    date_created: String,
}

#[derive(Debug, Serialize)]
struct CocoLicense {
    id: u64,
    name: String,
    url: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoImage {
    id: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    license: Option<u64>,

    file_name: String,

    #[serde(default)]
    height: u32,

    #[serde(default)]
    width: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_captured: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoCategory {
    id: u64,
    name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    supercategory: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoAnnotation {
    #[serde(default)]
    id: u64,
    image_id: u64,
    category_id: u64,

    /// COCO bbox format: [x, y, width, height] with (x,y) as top-left corner
    bbox: [f64; 4],

    #[serde(default, skip_serializing_if = "Option::is_none")]
    area: Option<f64>,

    /// Always empty on write; accepted but ignored on read.
    #[serde(default)]
    segmentation: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    iscrowd: Option<u8>,

    /// Non-standard: detector confidence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
}

// ============================================================================
// Public API
// ============================================================================

/// Reads an annotation set from a COCO JSON file.
///
/// The result is keyed by each image's `file_name`.
pub fn read_coco_json(path: &Path) -> Result<AnnotationSet, PrelabelError> {
    let file = File::open(path).map_err(PrelabelError::Io)?;
    let reader = BufReader::new(file);

    let coco: CocoInput =
        serde_json::from_reader(reader).map_err(|source| PrelabelError::CocoJsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    coco_to_set(coco).map_err(|message| PrelabelError::CocoJsonInvalid {
        path: path.to_path_buf(),
        message,
    })
}

/// Writes an annotation set to a COCO JSON file.
///
/// Every image key is opened to read its dimensions; images that cannot be
/// opened are left out of the document and listed in the returned report.
pub fn write_coco_json(path: &Path, set: &AnnotationSet) -> Result<IoReport, PrelabelError> {
    let (coco, report) = set_to_coco(set, read_image_dimensions);

    let file = File::create(path).map_err(PrelabelError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, &coco).map_err(|source| PrelabelError::CocoJsonWrite {
        path: path.to_path_buf(),
        source,
    })?;

    log::info!(
        "saved COCO annotations for {} image(s) to {}",
        coco.images.len(),
        path.display()
    );
    Ok(report)
}

/// Reads an annotation set from a COCO JSON string.
pub fn from_coco_str(json: &str) -> Result<AnnotationSet, PrelabelError> {
    let coco: CocoInput =
        serde_json::from_str(json).map_err(|source| PrelabelError::CocoJsonParse {
            path: "<memory>".into(),
            source,
        })?;
    coco_to_set(coco).map_err(|message| PrelabelError::CocoJsonInvalid {
        path: "<memory>".into(),
        message,
    })
}

/// Reads an annotation set from a COCO JSON byte slice.
///
/// Useful for fuzzing and processing raw bytes without UTF-8 validation overhead.
pub fn from_coco_slice(bytes: &[u8]) -> Result<AnnotationSet, PrelabelError> {
    let coco: CocoInput =
        serde_json::from_slice(bytes).map_err(|source| PrelabelError::CocoJsonParse {
            path: "<memory>".into(),
            source,
        })?;
    coco_to_set(coco).map_err(|message| PrelabelError::CocoJsonInvalid {
        path: "<memory>".into(),
        message,
    })
}

/// Encodes an annotation set as a COCO JSON string, using `probe` to look up
/// image dimensions instead of reading the files.
pub fn to_coco_string_with<F>(
    set: &AnnotationSet,
    probe: F,
) -> Result<(String, IoReport), serde_json::Error>
where
    F: FnMut(&Path) -> Result<(u32, u32), PrelabelError>,
{
    let (coco, report) = set_to_coco(set, probe);
    Ok((serde_json::to_string_pretty(&coco)?, report))
}

// ============================================================================
// Conversion: COCO -> set
// ============================================================================

fn coco_to_set(coco: CocoInput) -> Result<AnnotationSet, String> {
    let file_by_image: HashMap<u64, &str> = coco
        .images
        .iter()
        .map(|img| (img.id, img.file_name.as_str()))
        .collect();

    let name_by_category: HashMap<u64, &str> = coco
        .categories
        .iter()
        .map(|cat| (cat.id, cat.name.as_str()))
        .collect();

    let mut by_image: HashMap<u64, Vec<Annotation>> = HashMap::new();
    for ann in &coco.annotations {
        if !file_by_image.contains_key(&ann.image_id) {
            return Err(format!(
                "annotation {} references missing image {}",
                ann.id, ann.image_id
            ));
        }
        let label = name_by_category.get(&ann.category_id).ok_or_else(|| {
            format!(
                "annotation {} references missing category {}",
                ann.id, ann.category_id
            )
        })?;

        let score = ann.score.unwrap_or(MANUAL_SCORE);
        if !is_valid_score(score) {
            return Err(format!(
                "annotation {} has score {score} outside [0, 1]",
                ann.id
            ));
        }

        let [x, y, w, h] = ann.bbox;
        by_image.entry(ann.image_id).or_default().push(Annotation {
            bbox: BBox::from_xywh(x, y, w, h),
            label: (*label).to_string(),
            score,
        });
    }

    let mut set = AnnotationSet::new();
    for image in &coco.images {
        let annotations = by_image.remove(&image.id).unwrap_or_default();
        set.extend_image(image.file_name.as_str(), annotations);
    }

    Ok(set)
}

// ============================================================================
// Conversion: set -> COCO
// ============================================================================

fn set_to_coco<F>(set: &AnnotationSet, mut probe: F) -> (CocoDocument, IoReport)
where
    F: FnMut(&Path) -> Result<(u32, u32), PrelabelError>,
{
    let now = chrono::Local::now();
    let info = CocoInfo {
        description: INFO_DESCRIPTION.to_string(),
        url: String::new(),
        version: "1.0".to_string(),
        year: chrono::Datelike::year(&now),
        contributor: String::new(),
        date_created: now.format("%Y-%m-%d %H:%M:%S").to_string(),
    };

    let licenses = vec![CocoLicense {
        id: UNKNOWN_LICENSE_ID,
        name: "Unknown".to_string(),
        url: String::new(),
    }];

    let mut report = IoReport::new();
    let mut images = Vec::with_capacity(set.len());
    let mut annotations = Vec::with_capacity(set.annotation_count());
    let mut category_ids: IndexMap<&str, u64> = IndexMap::new();
    let mut next_annotation_id: u64 = 1;

    for (position, (image_key, image_annotations)) in set.iter().enumerate() {
        // Skipped images still consume their id
        let image_id = position as u64 + 1;

        let (width, height) = match probe(Path::new(image_key)) {
            Ok(dims) => dims,
            Err(err) => {
                report.record_skip(image_key, err);
                continue;
            }
        };

        images.push(CocoImage {
            id: image_id,
            license: Some(UNKNOWN_LICENSE_ID),
            file_name: basename(image_key),
            height,
            width,
            date_captured: Some(String::new()),
        });

        for ann in image_annotations {
            let next_category_id = category_ids.len() as u64 + 1;
            let category_id = *category_ids
                .entry(ann.label.as_str())
                .or_insert(next_category_id);

            let (x, y, w, h) = ann.bbox.to_xywh();
            annotations.push(CocoAnnotation {
                id: next_annotation_id,
                image_id,
                category_id,
                bbox: [x, y, w, h],
                area: Some(w * h),
                segmentation: serde_json::Value::Array(vec![]),
                iscrowd: Some(0),
                score: Some(ann.score),
            });
            next_annotation_id += 1;
        }

        report.record_processed();
    }

    log::debug!("assigned {} COCO categories", category_ids.len());

    let categories = category_ids
        .into_iter()
        .map(|(name, id)| CocoCategory {
            id,
            name: name.to_string(),
            supercategory: Some("none".to_string()),
        })
        .collect();

    let coco = CocoDocument {
        info,
        licenses,
        images,
        annotations,
        categories,
    };
    (coco, report)
}

/// Final path component of an image key, or the key itself.
pub(crate) fn basename(image_key: &str) -> String {
    Path::new(image_key)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| image_key.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_probe(path: &Path) -> Result<(u32, u32), PrelabelError> {
        if path.to_string_lossy().contains("missing") {
            Err(PrelabelError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such file",
            )))
        } else {
            Ok((640, 480))
        }
    }

    fn sample_set() -> AnnotationSet {
        let mut set = AnnotationSet::new();
        set.insert(
            "photos/street.jpg",
            vec![
                Annotation::new(BBox::from_xyxy(10.0, 20.0, 100.0, 80.0), "car").with_score(0.9),
                Annotation::new(BBox::from_xyxy(5.0, 5.0, 15.0, 40.0), "person"),
            ],
        );
        set.insert(
            "photos/park.jpg",
            vec![Annotation::new(BBox::from_xyxy(1.0, 1.0, 2.0, 2.0), "car").with_score(0.4)],
        );
        set
    }

    fn encode(set: &AnnotationSet) -> (serde_json::Value, IoReport) {
        let (json, report) = to_coco_string_with(set, fixed_probe).expect("serialize failed");
        (serde_json::from_str(&json).unwrap(), report)
    }

    #[test]
    fn test_encode_bbox_is_xywh() {
        let (parsed, report) = encode(&sample_set());
        assert_eq!(report.processed, 2);

        let bbox = &parsed["annotations"][0]["bbox"];
        // XYXY [10, 20, 100, 80] should become XYWH [10, 20, 90, 60]
        assert_eq!(bbox[0], 10.0);
        assert_eq!(bbox[1], 20.0);
        assert_eq!(bbox[2], 90.0);
        assert_eq!(bbox[3], 60.0);
        assert_eq!(parsed["annotations"][0]["area"], 5400.0);
        assert_eq!(parsed["annotations"][0]["iscrowd"], 0);
        assert_eq!(parsed["annotations"][0]["segmentation"], serde_json::json!([]));
        assert_eq!(parsed["annotations"][0]["score"], 0.9);
    }

    #[test]
    fn test_encode_ids_and_categories() {
        let (parsed, _) = encode(&sample_set());

        assert_eq!(parsed["images"][0]["id"], 1);
        assert_eq!(parsed["images"][0]["file_name"], "street.jpg");
        assert_eq!(parsed["images"][0]["width"], 640);
        assert_eq!(parsed["images"][1]["id"], 2);

        // Annotation ids run across the whole document
        let ids: Vec<_> = parsed["annotations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);

        // First-seen category order, shared across images
        assert_eq!(parsed["categories"][0]["name"], "car");
        assert_eq!(parsed["categories"][0]["id"], 1);
        assert_eq!(parsed["categories"][1]["name"], "person");
        assert_eq!(parsed["categories"][1]["id"], 2);
        assert_eq!(parsed["annotations"][2]["category_id"], 1);
    }

    #[test]
    fn test_encode_writes_header() {
        let (parsed, _) = encode(&sample_set());
        assert_eq!(parsed["info"]["description"], INFO_DESCRIPTION);
        assert_eq!(parsed["licenses"][0]["name"], "Unknown");
        assert_eq!(parsed["images"][0]["license"], 1);
        assert_eq!(parsed["categories"][0]["supercategory"], "none");
    }

    #[test]
    fn test_encode_skips_unopenable_images() {
        let mut set = sample_set();
        set.insert(
            "photos/missing.jpg",
            vec![Annotation::new(BBox::from_xyxy(0.0, 0.0, 1.0, 1.0), "ghost")],
        );
        set.insert(
            "photos/last.jpg",
            vec![Annotation::new(BBox::from_xyxy(0.0, 0.0, 1.0, 1.0), "car")],
        );

        let (parsed, report) = encode(&set);
        assert_eq!(report.processed, 3);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.skipped[0].item, "photos/missing.jpg");

        let images = parsed["images"].as_array().unwrap();
        assert_eq!(images.len(), 3);
        assert_eq!(images[2]["file_name"], "last.jpg");
        assert_eq!(parsed["annotations"].as_array().unwrap().len(), 4);
        assert!(parsed["categories"]
            .as_array()
            .unwrap()
            .iter()
            .all(|c| c["name"] != "ghost"));
    }

    #[test]
    fn test_decode_converts_and_defaults_score() {
        let json = r#"{
            "images": [
                {"id": 7, "width": 640, "height": 480, "file_name": "a.jpg"},
                {"id": 3, "width": 640, "height": 480, "file_name": "b.jpg"}
            ],
            "categories": [{"id": 4, "name": "dog"}],
            "annotations": [
                {"id": 1, "image_id": 3, "category_id": 4, "bbox": [10, 20, 90, 60]},
                {"id": 2, "image_id": 7, "category_id": 4, "bbox": [0, 0, 5, 5], "score": 0.25}
            ]
        }"#;

        let set = from_coco_str(json).expect("parse failed");
        let keys: Vec<_> = set.image_keys().collect();
        assert_eq!(keys, vec!["a.jpg", "b.jpg"]);

        let b = set.get("b.jpg").unwrap();
        assert_eq!(b[0].bbox, BBox::from_xyxy(10.0, 20.0, 100.0, 80.0));
        assert_eq!(b[0].score, 1.0);
        assert_eq!(b[0].label, "dog");
        assert_eq!(set.get("a.jpg").unwrap()[0].score, 0.25);
    }

    #[test]
    fn test_decode_rejects_dangling_category() {
        let json = r#"{
            "images": [{"id": 1, "file_name": "a.jpg"}],
            "categories": [],
            "annotations": [{"id": 1, "image_id": 1, "category_id": 9, "bbox": [0, 0, 1, 1]}]
        }"#;
        let err = from_coco_str(json).unwrap_err();
        assert!(matches!(err, PrelabelError::CocoJsonInvalid { .. }));
    }

    #[test]
    fn test_decode_rejects_score_outside_unit_range() {
        for score in ["3.5", "-2", "1.0000001"] {
            let json = format!(
                r#"{{
                    "images": [{{"id": 1, "file_name": "a.jpg"}}],
                    "categories": [{{"id": 1, "name": "cat"}}],
                    "annotations": [
                        {{"id": 5, "image_id": 1, "category_id": 1, "bbox": [0, 0, 1, 1], "score": {score}}}
                    ]
                }}"#
            );
            let err = from_coco_str(&json).unwrap_err();
            assert!(matches!(err, PrelabelError::CocoJsonInvalid { .. }), "{score}");
            assert!(err.to_string().contains("annotation 5 has score"), "{err}");
        }
    }

    #[test]
    fn test_decode_accepts_score_bounds() {
        let json = r#"{
            "images": [{"id": 1, "file_name": "a.jpg"}],
            "categories": [{"id": 1, "name": "cat"}],
            "annotations": [
                {"id": 1, "image_id": 1, "category_id": 1, "bbox": [0, 0, 1, 1], "score": 0},
                {"id": 2, "image_id": 1, "category_id": 1, "bbox": [0, 0, 1, 1], "score": 1}
            ]
        }"#;
        let set = from_coco_str(json).expect("parse failed");
        let scores: Vec<f64> = set.get("a.jpg").unwrap().iter().map(|a| a.score).collect();
        assert_eq!(scores, vec![0.0, 1.0]);
    }

    #[test]
    fn test_roundtrip_rekeys_by_basename() {
        let original = sample_set();
        let (json, _) = to_coco_string_with(&original, fixed_probe).unwrap();
        let restored = from_coco_str(&json).unwrap();

        assert!(!restored.contains("photos/street.jpg"));
        let street = restored.get("street.jpg").expect("keyed by file name");
        assert_eq!(street, original.get("photos/street.jpg").unwrap());
        assert_eq!(restored.annotation_count(), original.annotation_count());
    }
}
