//! Error types for slide reconstruction.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Maximum number of characters of a bad response kept for diagnostics.
pub const PREVIEW_CHARS: usize = 200;

/// Errors that can occur while rebuilding a slide deck from images.
///
/// Per-element problems (bad boxes, noise, duplicates) are never errors; they
/// are logged and counted by the normalizer instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open, read or write a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The service response contained no recoverable JSON object.
    #[error("Failed to parse JSON from response: {preview}")]
    Parse {
        /// The first characters of the cleaned response text.
        preview: String,
    },

    /// The vision classification call failed or returned nothing.
    #[error("Vision service call failed: {0}")]
    Upstream(String),

    /// A required setting (usually a credential) is missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The caller handed over structurally invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Image decoding, encoding or cropping failed.
    #[error("Image error: {0}")]
    Image(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    Zip(String),

    /// XML writing error.
    #[error("XML error: {0}")]
    Xml(String),
}

impl Error {
    /// Build a parse error from the cleaned response text, truncated to
    /// [`PREVIEW_CHARS`] characters.
    pub fn parse(cleaned: &str) -> Self {
        Error::Parse {
            preview: cleaned.chars().take(PREVIEW_CHARS).collect(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_truncates_preview() {
        let long = "x".repeat(500);
        match Error::parse(&long) {
            Error::Parse { preview } => assert_eq!(preview.chars().count(), PREVIEW_CHARS),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_error_preview_respects_char_boundaries() {
        let text = "é".repeat(300);
        let err = Error::parse(&text);
        assert!(err.to_string().starts_with("Failed to parse JSON from response: é"));
    }
}
