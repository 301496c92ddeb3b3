//! AI-vision strategy: Gemini `generateContent` with the PDF as inline data
//!
//! The model reads the rendered pages itself, so scanned documents work.
//! The response must carry a `MARKDOWN:` section followed by a `SUMMARY:`
//! section.

use async_trait::async_trait;
use base64::Engine as _;
use docpipe_core::port::{ExtractionError, ExtractionOutput, ExtractionStrategy, ProgressReporter};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const SUMMARY_MARKER: &str = "SUMMARY:";
const MARKDOWN_MARKER: &str = "MARKDOWN:";

const PROMPT: &str = "Convert the attached PDF document to markdown format and provide a concise summary.

Please format the response as:
MARKDOWN:
[markdown formatted text]

SUMMARY:
[concise summary]";

/// Gemini connection settings
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Missing key is reported per job, not at startup
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(90),
        }
    }
}

/// Gemini-backed extraction strategy
pub struct AiVisionStrategy {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl AiVisionStrategy {
    pub fn new(config: GeminiConfig) -> Result<Self, ExtractionError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ExtractionError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the API endpoint URL
    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[derive(serde::Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(serde::Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(serde::Serialize)]
#[serde(untagged)]
enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
    Text {
        text: String,
    },
}

#[derive(serde::Serialize)]
struct Blob {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(serde::Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(serde::Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(serde::Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(serde::Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(serde::Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl ExtractionStrategy for AiVisionStrategy {
    async fn extract(
        &self,
        document: &[u8],
        progress: &ProgressReporter,
    ) -> Result<ExtractionOutput, ExtractionError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            ExtractionError::Configuration(
                "Gemini API key not configured (set GOOGLE_API_KEY)".to_string(),
            )
        })?;

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::InlineData {
                        inline_data: Blob {
                            mime_type: "application/pdf".to_string(),
                            data: base64::engine::general_purpose::STANDARD.encode(document),
                        },
                    },
                    Part::Text {
                        text: PROMPT.to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig { temperature: 0.2 },
        };

        progress.report(format!("sending document to {}", self.config.model));
        info!(model = %self.config.model, size = document.len(), "Requesting Gemini extraction");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractionError::Remote(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Remote(format!(
                "Gemini generation failed ({}): {}",
                status, body
            )));
        }

        let gen_response: GenerateResponse = response.json().await.map_err(|e| {
            ExtractionError::MalformedResponse(format!("Failed to parse Gemini response: {}", e))
        })?;

        progress.report("parsing response");
        let text: String = gen_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        debug!(response_len = text.len(), "Gemini response received");
        parse_response(&text)
    }
}

/// Split a `MARKDOWN: ... SUMMARY: ...` response into content and summary
fn parse_response(text: &str) -> Result<ExtractionOutput, ExtractionError> {
    if text.trim().is_empty() {
        return Err(ExtractionError::MalformedResponse(
            "No text in Gemini response".to_string(),
        ));
    }

    let (markdown, summary) = text.split_once(SUMMARY_MARKER).ok_or_else(|| {
        ExtractionError::MalformedResponse(format!("response has no {} section", SUMMARY_MARKER))
    })?;

    let content = markdown.replacen(MARKDOWN_MARKER, "", 1).trim().to_string();
    let summary = summary.trim().to_string();

    if content.is_empty() {
        return Err(ExtractionError::MalformedResponse(
            "response has an empty markdown section".to_string(),
        ));
    }
    if summary.is_empty() {
        return Err(ExtractionError::MalformedResponse(
            "response has an empty summary section".to_string(),
        ));
    }

    Ok(ExtractionOutput { content, summary })
}
