//! Blocking client for the Gemini `generateContent` endpoint.

use crate::config::VisionConfig;
use base64::Engine as _;
use deck_core::{Error, Result, VisionRequest, VisionService};
use serde::{Deserialize, Serialize};

/// Low temperature keeps box coordinates stable between calls.
const TEMPERATURE: f64 = 0.1;

pub struct GeminiClient {
    config: VisionConfig,
    client: reqwest::blocking::Client,
}

impl GeminiClient {
    pub fn new(config: VisionConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        log::info!("Vision client ready (model {})", config.model);
        Ok(Self { config, client })
    }

    /// Configure from the environment; see [`VisionConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(VisionConfig::from_env()?)
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Image {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Image first, then the instructions.
fn build_request<'a>(request: &VisionRequest<'a>) -> GenerateContentRequest<'a> {
    let data = base64::engine::general_purpose::STANDARD.encode(request.png);
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part::Image {
                    inline_data: InlineData {
                        mime_type: "image/png",
                        data,
                    },
                },
                Part::Text {
                    text: request.prompt,
                },
            ],
        }],
        generation_config: GenerationConfig {
            temperature: TEMPERATURE,
            response_mime_type: "application/json",
        },
    }
}

/// Concatenate the text parts of the first candidate.
fn response_text(response: GenerateContentResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(Error::Upstream(
            "vision service returned an empty response".to_string(),
        ));
    }
    Ok(text)
}

impl VisionService for GeminiClient {
    fn identify_elements(&self, request: &VisionRequest<'_>) -> Result<String> {
        let url = self.config.endpoint();
        log::debug!(
            "Calling vision model {} for '{}' ({} bytes)",
            self.config.model,
            request.name,
            request.png.len()
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&build_request(request))
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    Error::Upstream(format!("Cannot reach {}", self.config.api_base))
                } else if e.is_timeout() {
                    Error::Upstream(format!(
                        "Request timed out after {}s",
                        self.config.timeout.as_secs()
                    ))
                } else {
                    Error::Upstream(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Upstream(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.chars().take(deck_core::error::PREVIEW_CHARS).collect::<String>()
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|e| Error::Upstream(format!("Undecodable response body: {}", e)))?;

        response_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::ImageSize;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let request = VisionRequest {
            name: "slide.png",
            png: b"png",
            size: ImageSize::new(10, 10),
            prompt: "find elements",
        };
        let body = serde_json::to_value(build_request(&request)).unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [{
                    "parts": [
                        {"inlineData": {"mimeType": "image/png", "data": "cG5n"}},
                        {"text": "find elements"}
                    ]
                }],
                "generationConfig": {
                    "temperature": 0.1,
                    "responseMimeType": "application/json"
                }
            })
        );
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"icons\":"}, {"text": " []}"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(response_text(response).unwrap(), "{\"icons\": []}");
    }

    #[test]
    fn test_empty_response_is_upstream_error() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({"candidates": []})).unwrap();
        assert!(matches!(response_text(response), Err(Error::Upstream(_))));

        let response: GenerateContentResponse =
            serde_json::from_value(json!({"candidates": [{"finishReason": "SAFETY"}]})).unwrap();
        assert!(matches!(response_text(response), Err(Error::Upstream(_))));
    }

    #[test]
    fn test_unreachable_service_is_upstream_error() {
        let config = VisionConfig::new("k")
            .with_api_base("http://127.0.0.1:9")
            .with_timeout(std::time::Duration::from_secs(2));
        let client = GeminiClient::new(config).unwrap();
        let request = VisionRequest {
            name: "slide.png",
            png: b"png",
            size: ImageSize::new(1, 1),
            prompt: "p",
        };
        assert!(matches!(
            client.identify_elements(&request),
            Err(Error::Upstream(_))
        ));
    }
}
