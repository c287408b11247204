//! Image loading and encoding helpers.

use crate::error::{Error, Result};
use crate::types::{BoundingBox, ImageSize};
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::path::Path;

/// Decode an image file.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| Error::Image(format!("Failed to load {}: {}", path.display(), e)))
}

/// Encode an image as PNG bytes.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Pixel dimensions of a decoded image.
pub fn image_size(image: &DynamicImage) -> ImageSize {
    let (width, height) = image.dimensions();
    ImageSize::new(width, height)
}

/// Cut the pixels under a box out of an image.
///
/// Both corners are truncated to whole pixels and clipped to the image; the
/// crop is always at least one pixel wide and tall.
pub fn crop_region(image: &DynamicImage, bbox: &BoundingBox) -> Result<DynamicImage> {
    let (width, height) = image.dimensions();
    let x = bbox.x.max(0.0) as u32;
    let y = bbox.y.max(0.0) as u32;
    if x >= width || y >= height {
        return Err(Error::InvalidInput(format!(
            "box {} lies outside the {}x{} image",
            bbox, width, height
        )));
    }

    let right = (bbox.x + bbox.width).max(0.0) as u32;
    let bottom = (bbox.y + bbox.height).max(0.0) as u32;
    let w = right.saturating_sub(x).clamp(1, width - x);
    let h = bottom.saturating_sub(y).clamp(1, height - y);
    Ok(image.crop_imm(x, y, w, h))
}
