//! Vision service settings, read from the environment.

use deck_core::{Error, Result};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-3-pro-image-preview";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Clone)]
pub struct VisionConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for VisionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl VisionConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Read `GOOGLE_API_KEY` (required), `GOOGLE_API_BASE`,
    /// `DECK_VISION_MODEL` and `DECK_VISION_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("GOOGLE_API_KEY").ok_or_else(|| {
            Error::Configuration("GOOGLE_API_KEY is required for the vision service".to_string())
        })?;

        let mut config = Self::new(api_key);
        if let Some(base) = get("GOOGLE_API_BASE") {
            config = config.with_api_base(&base);
        }
        if let Some(model) = get("DECK_VISION_MODEL") {
            config.model = model.trim().to_string();
        }
        if let Some(secs) = get("DECK_VISION_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::Configuration(format!(
                    "DECK_VISION_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    secs
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `{base}/v1beta/models/{model}:generateContent`
    pub fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.api_base, self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let err = VisionConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = VisionConfig::from_lookup(lookup(&[("GOOGLE_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_defaults() {
        let config = VisionConfig::from_lookup(lookup(&[("GOOGLE_API_KEY", "k")])).unwrap();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_overrides() {
        let config = VisionConfig::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "k"),
            ("GOOGLE_API_BASE", "https://proxy.example.com/"),
            ("DECK_VISION_MODEL", "gemini-2.5-flash"),
            ("DECK_VISION_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(
            config.endpoint(),
            "https://proxy.example.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_bad_timeout() {
        let err = VisionConfig::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "k"),
            ("DECK_VISION_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_debug_hides_key() {
        let config = VisionConfig::new("secret-key");
        assert!(!format!("{:?}", config).contains("secret-key"));
    }
}
