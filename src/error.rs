use std::path::PathBuf;
use thiserror::Error;

/// The main error type for prelabel operations.
#[derive(Debug, Error)]
pub enum PrelabelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse COCO JSON from {path}: {source}")]
    CocoJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write COCO JSON to {path}: {source}")]
    CocoJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid COCO document {path}: {message}")]
    CocoJsonInvalid { path: PathBuf, message: String },

    #[error("Failed to parse VOC XML {path}: {message}")]
    VocXmlParse { path: PathBuf, message: String },

    #[error("Invalid VOC layout at {path}: {message}")]
    VocLayoutInvalid { path: PathBuf, message: String },

    #[error("Failed to write VOC XML to {path}: {message}")]
    VocWrite { path: PathBuf, message: String },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageDimensionRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Failed to render overlay for {path}: {source}")]
    ImageRender {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid {name} {value}: expected a value strictly between 0 and 1")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("Invalid detector output: {0}")]
    InvalidDetections(String),

    #[error("Detector '{program}' failed: {message}")]
    DetectorFailed { program: String, message: String },

    #[error("Invalid edit operation: {0}")]
    InvalidEditOp(String),
}
