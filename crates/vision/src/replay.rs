//! Serves recorded vision responses from a directory.

use deck_core::{Error, Result, VisionRequest, VisionService};
use std::fs;
use std::path::{Path, PathBuf};

/// Looks up `<dir>/<image stem>.json`, then `<dir>/<image stem>.txt`.
pub struct ReplayClient {
    dir: PathBuf,
}

impl ReplayClient {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn recording_for(&self, name: &str) -> Option<PathBuf> {
        let stem = Path::new(name).file_stem()?.to_str()?;
        ["json", "txt"]
            .iter()
            .map(|ext| self.dir.join(format!("{}.{}", stem, ext)))
            .find(|path| path.is_file())
    }
}

impl VisionService for ReplayClient {
    fn identify_elements(&self, request: &VisionRequest<'_>) -> Result<String> {
        let path = self.recording_for(request.name).ok_or_else(|| {
            Error::Upstream(format!(
                "no recorded response for '{}' in {}",
                request.name,
                self.dir.display()
            ))
        })?;

        log::debug!("Replaying {} for '{}'", path.display(), request.name);
        fs::read_to_string(&path)
            .map_err(|e| Error::Upstream(format!("Failed to read {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::ImageSize;

    fn request(name: &str) -> VisionRequest<'_> {
        VisionRequest {
            name,
            png: &[],
            size: ImageSize::new(1, 1),
            prompt: "",
        }
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("deck-replay-{}-{}", tag, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_replays_json_then_txt() {
        let dir = scratch_dir("order");
        fs::write(dir.join("slide_01.json"), "{\"icons\": []}").unwrap();
        fs::write(dir.join("slide_01.txt"), "text").unwrap();
        fs::write(dir.join("slide_02.txt"), "```json\n{}\n```").unwrap();

        let client = ReplayClient::new(&dir);
        assert_eq!(
            client.identify_elements(&request("slides/slide_01.png")).unwrap(),
            "{\"icons\": []}"
        );
        assert_eq!(
            client.identify_elements(&request("slide_02.jpg")).unwrap(),
            "```json\n{}\n```"
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_recording_is_upstream_error() {
        let dir = scratch_dir("missing");
        let client = ReplayClient::new(&dir);
        let err = client.identify_elements(&request("nothing.png")).unwrap_err();
        assert!(matches!(err, Error::Upstream(ref m) if m.contains("nothing.png")));
        fs::remove_dir_all(&dir).unwrap();
    }
}
