//! Image dimension probing.

use std::path::Path;

use crate::error::PrelabelError;

/// Reads `(width, height)` from an image header without decoding pixels.
pub fn read_image_dimensions(path: &Path) -> Result<(u32, u32), PrelabelError> {
    let size = imagesize::size(path).map_err(|source| PrelabelError::ImageDimensionRead {
        path: path.to_path_buf(),
        source,
    })?;

    let corrupted = || PrelabelError::ImageDimensionRead {
        path: path.to_path_buf(),
        source: imagesize::ImageError::CorruptedImage,
    };
    let width = u32::try_from(size.width).map_err(|_| corrupted())?;
    let height = u32::try_from(size.height).map_err(|_| corrupted())?;
    if width == 0 || height == 0 {
        return Err(corrupted());
    }

    Ok((width, height))
}
