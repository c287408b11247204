//! Seam to the external vision classification service.

use crate::error::Result;
use crate::types::ImageSize;

/// One element-identification call.
#[derive(Debug, Clone, Copy)]
pub struct VisionRequest<'a> {
    /// Name of the source image (usually its file name).
    pub name: &'a str,
    /// The image, PNG-encoded.
    pub png: &'a [u8],
    pub size: ImageSize,
    pub prompt: &'a str,
}

/// A service that looks at a slide image and describes its elements.
///
/// Implementations return the raw response text. They fail with
/// [`Error::Upstream`](crate::Error::Upstream) when the call itself fails
/// and must not retry; the caller decides how to degrade.
pub trait VisionService {
    fn identify_elements(&self, request: &VisionRequest<'_>) -> Result<String>;
}

impl<T: VisionService + ?Sized> VisionService for &T {
    fn identify_elements(&self, request: &VisionRequest<'_>) -> Result<String> {
        (**self).identify_elements(request)
    }
}

impl<T: VisionService + ?Sized> VisionService for Box<T> {
    fn identify_elements(&self, request: &VisionRequest<'_>) -> Result<String> {
        (**self).identify_elements(request)
    }
}
