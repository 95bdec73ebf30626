#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;

use prelabel::ir::{Annotation, AnnotationSet, BBox};
use prelabel::PrelabelError;
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub const EPS_COCO: f64 = 1e-9;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// A generated set plus the dimensions of every image in it.
#[derive(Clone, Debug)]
pub struct SetFixture {
    pub set: AnnotationSet,
    pub dims: HashMap<String, (u32, u32)>,
}

impl SetFixture {
    /// Dimension lookup that stands in for opening the image files.
    pub fn probe(&self) -> impl FnMut(&Path) -> Result<(u32, u32), PrelabelError> + '_ {
        move |path: &Path| {
            self.dims
                .get(&*path.to_string_lossy())
                .copied()
                .ok_or_else(|| {
                    PrelabelError::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        path.display().to_string(),
                    ))
                })
        }
    }
}

pub fn arb_label() -> BoxedStrategy<String> {
    prop_oneof![
        Just("person".to_string()),
        Just("traffic light".to_string()),
        "[a-z]{1,8}",
        "[a-z]{1,4} & [a-z]{1,4}",
    ]
    .boxed()
}

pub fn arb_score() -> BoxedStrategy<f64> {
    prop_oneof![Just(1.0), (0u32..=1000).prop_map(|v| f64::from(v) / 1000.0)].boxed()
}

/// Corners inside `[0, width) x [0, height)` with `x1 < x2` and `y1 < y2`,
/// a mix of whole and fractional values.
pub fn arb_bbox_within(width: u32, height: u32) -> BoxedStrategy<BBox> {
    let max_x = f64::from(width - 1);
    let max_y = f64::from(height - 1);
    (
        0.0..max_x,
        0.0..max_y,
        0.0f64..1.0,
        0.0f64..1.0,
        any::<bool>(),
    )
        .prop_map(move |(x1, y1, fx, fy, whole)| {
            let x2 = x1 + (max_x - x1) * fx.max(0.05);
            let y2 = y1 + (max_y - y1) * fy.max(0.05);
            if whole {
                BBox::from_xyxy(x1.floor(), y1.floor(), x2.ceil(), y2.ceil())
            } else {
                BBox::from_xyxy(x1, y1, x2, y2)
            }
        })
        .boxed()
}

pub fn arb_annotation_within(width: u32, height: u32) -> BoxedStrategy<Annotation> {
    (arb_bbox_within(width, height), arb_label(), arb_score())
        .prop_map(|(bbox, label, score)| Annotation::new(bbox, label).with_score(score))
        .boxed()
}

/// Sets of up to `max_images` images with distinct basenames, each with up
/// to `max_annotations` boxes. Keys carry a directory component.
pub fn arb_set(max_images: usize, max_annotations: usize) -> BoxedStrategy<SetFixture> {
    proptest::collection::vec((8u32..=640, 8u32..=480), 1..=max_images)
        .prop_flat_map(move |sizes| {
            let per_image: Vec<_> = sizes
                .iter()
                .map(|&(w, h)| {
                    proptest::collection::vec(arb_annotation_within(w, h), 0..=max_annotations)
                })
                .collect();
            (Just(sizes), per_image)
        })
        .prop_map(|(sizes, per_image)| {
            let mut set = AnnotationSet::new();
            let mut dims = HashMap::new();
            for (index, (size, annotations)) in sizes.into_iter().zip(per_image).enumerate() {
                let key = format!("shots/img_{index:03}.jpg");
                dims.insert(key.clone(), size);
                set.insert(key, annotations);
            }
            SetFixture { set, dims }
        })
        .boxed()
}

/// Compares two sets image by image after mapping `a`'s keys with `rekey`.
pub fn assert_sets_equivalent(
    a: &AnnotationSet,
    b: &AnnotationSet,
    rekey: impl Fn(&str) -> String,
    mut expected_bbox: impl FnMut(&BBox) -> BBox,
    eps: f64,
) -> Result<(), String> {
    if a.len() != b.len() {
        return Err(format!("image count differs: {} vs {}", a.len(), b.len()));
    }
    for (key, left) in a.iter() {
        let mapped = rekey(key);
        let right = b
            .get(&mapped)
            .ok_or_else(|| format!("missing image {mapped}"))?;
        if left.len() != right.len() {
            return Err(format!(
                "{mapped}: {} boxes vs {}",
                left.len(),
                right.len()
            ));
        }
        for (index, (l, r)) in left.iter().zip(right).enumerate() {
            let wanted = expected_bbox(&l.bbox);
            let close = wanted
                .to_array()
                .iter()
                .zip(r.bbox.to_array())
                .all(|(w, got)| (w - got).abs() <= eps);
            if l.label != r.label || l.score != r.score || !close {
                return Err(format!("{mapped}[{index}]: {l:?} became {r:?}"));
            }
        }
    }
    Ok(())
}
