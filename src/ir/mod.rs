//! In-memory annotation representation and its on-disk codecs.
//!
//! The [`AnnotationSet`] is the hub every conversion passes through: the COCO
//! and PASCAL VOC readers produce one, the writers consume one, and the editor
//! works on a single image's slice of it.
//!
//! # Example
//!
//! ```
//! use prelabel::ir::{Annotation, AnnotationSet, BBox};
//!
//! let mut set = AnnotationSet::new();
//! set.insert(
//!     "images/street.jpg",
//!     vec![Annotation::new(BBox::from_xyxy(10.0, 20.0, 100.0, 200.0), "person")],
//! );
//! assert_eq!(set.annotation_count(), 1);
//! ```

mod bbox;
pub mod io_coco_json;
pub mod io_voc_xml;
mod model;
mod probe;
mod report;

pub use bbox::BBox;
pub use model::{is_valid_score, Annotation, AnnotationSet, MANUAL_SCORE};
pub use probe::read_image_dimensions;
pub use report::{IoReport, SkippedItem};
