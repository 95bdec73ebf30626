//! Bounding box type in corner (XYXY) form.

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box `[x1, y1, x2, y2]` in pixel coordinates.
///
/// `(x1, y1)` is the top-left corner and `(x2, y2)` the bottom-right corner,
/// with the origin at the top-left of the image. Detector output carries
/// fractional coordinates; manual edits and VOC input carry whole numbers.
///
/// Note: This type does NOT enforce `x1 < x2` or `y1 < y2`. The editor keeps
/// boxes well-formed on the resize path, and codecs write whatever they are
/// handed, so malformed boxes remain representable rather than panicking.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BBox {
    /// Creates a new bounding box from explicit corner coordinates.
    #[inline]
    pub fn from_xyxy(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Converts from XYWH format (x, y, width, height) where (x, y) is the top-left corner.
    ///
    /// This is the format used by COCO annotations.
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_xyxy(x, y, x + width, y + height)
    }

    /// Converts to XYWH format (x, y, width, height).
    #[inline]
    pub fn to_xywh(&self) -> (f64, f64, f64, f64) {
        (self.x1, self.y1, self.width(), self.height())
    }

    /// Returns the corners as `[x1, y1, x2, y2]`.
    #[inline]
    pub fn to_array(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Returns the width of the bounding box.
    ///
    /// May be negative if the box is malformed (x2 < x1).
    #[inline]
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    /// Returns the height of the bounding box.
    ///
    /// May be negative if the box is malformed (y2 < y1).
    #[inline]
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Returns the area of the bounding box.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Returns true if `(x, y)` lies inside the box, edges included.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.x1 <= x && x <= self.x2 && self.y1 <= y && y <= self.y2
    }

    /// Returns true if all coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Returns true if any coordinate has a fractional part.
    pub fn has_subpixel_coords(&self) -> bool {
        self.to_array().iter().any(|v| v.fract() != 0.0)
    }

    /// Truncates every coordinate toward zero.
    pub fn truncated(&self) -> [i64; 4] {
        [
            self.x1.trunc() as i64,
            self.y1.trunc() as i64,
            self.x2.trunc() as i64,
            self.y2.trunc() as i64,
        ]
    }
}

impl From<[f64; 4]> for BBox {
    fn from([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Self::from_xyxy(x1, y1, x2, y2)
    }
}

// Serialized as a plain `[x1, y1, x2, y2]` array
impl Serialize for BBox {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BBox {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let corners = <[f64; 4]>::deserialize(deserializer)?;
        Ok(BBox::from(corners))
    }
}
