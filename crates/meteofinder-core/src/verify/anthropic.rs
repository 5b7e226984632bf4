use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::consts::DEFAULT_REMOTE_TIMEOUT_SECS;
use crate::error::{MeteorError, RemoteError, Result};

use super::upload::{prepare_upload, UploadSettings};
use super::{Classification, Confidence, MeteorClassifier, VerificationRequest};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const API_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const PLACEHOLDER_KEY: &str = "your-api-key-here";
const MAX_RESPONSE_TOKENS: u32 = 256;

const CLASSIFICATION_PROMPT: &str = r#"You are looking at a night-sky photograph. Decide whether it shows a meteor (shooting star).

A meteor is a single bright, straight streak with a distinct start and end inside the frame. It may be faint or bright, usually white, yellow or slightly tinted.

These are NOT meteors:
- aircraft: dashed or dotted trails, blinking or red lights, parallel light pairs
- satellites: long, even, perfectly uniform lines
- star trails: many parallel arcs sharing one direction
- lens flares, reflections, scratches, sensor artifacts

Reply with JSON only, exactly in this shape:
{"is_meteor": true, "confidence": "high", "description": "one or two sentences"}

confidence is one of "high", "medium", "low"."#;

/// Connection settings for the Anthropic Messages API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnthropicSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub upload: UploadSettings,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_REMOTE_TIMEOUT_SECS
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
            upload: UploadSettings::default(),
        }
    }
}

/// Rough plausibility check before any network call is made.
pub fn api_key_looks_valid(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && key != PLACEHOLDER_KEY && key.len() > 10
}

/// Meteor classifier backed by a Claude vision model.
pub struct AnthropicClassifier {
    api_key: String,
    settings: AnthropicSettings,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

impl AnthropicClassifier {
    pub fn new(api_key: impl Into<String>, settings: AnthropicSettings) -> Result<Self> {
        let api_key = api_key.into();
        if !api_key_looks_valid(&api_key) {
            return Err(MeteorError::Configuration(
                "Anthropic API key is missing or looks like a placeholder".into(),
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| MeteorError::Configuration(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            settings,
            client,
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> RemoteError {
        if e.is_timeout() {
            RemoteError::Timeout(self.settings.timeout_secs)
        } else if e.is_connect() || e.is_request() {
            RemoteError::Transient(e.to_string())
        } else {
            RemoteError::Unknown(e.to_string())
        }
    }
}

impl MeteorClassifier for AnthropicClassifier {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn classify(&self, request: &VerificationRequest) -> std::result::Result<Classification, RemoteError> {
        let image = prepare_upload(
            &request.path,
            request.segment.as_ref(),
            request.analysis_scale,
            &self.settings.upload,
        )
        .map_err(|e| RemoteError::Unknown(format!("cannot prepare image: {e}")))?;

        let body = json!({
            "model": self.settings.model,
            "max_tokens": MAX_RESPONSE_TOKENS,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": image.media_type,
                            "data": image.to_base64(),
                        }
                    },
                    { "type": "text", "text": CLASSIFICATION_PROMPT }
                ]
            }]
        });

        let url = format!("{}/v1/messages", self.settings.base_url.trim_end_matches('/'));
        debug!(path = %request.path.display(), bytes = image.bytes.len(), "Sending verification request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let text = response.text().map_err(|e| self.map_send_error(e))?;
        if !status.is_success() {
            return Err(status_error(status.as_u16(), &text));
        }

        let parsed: MessagesResponse = serde_json::from_str(&text)
            .map_err(|e| RemoteError::Unknown(format!("unexpected response body: {e}")))?;
        let answer: String = parsed
            .content
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect();

        Ok(parse_classification(&answer))
    }
}

/// Map a non-success HTTP status to a [`RemoteError`].
pub fn status_error(status: u16, body: &str) -> RemoteError {
    let detail = format!("HTTP {status}: {}", truncate(body, 200));
    match status {
        401 | 403 => RemoteError::Unauthorized(detail),
        429 => RemoteError::RateLimited(detail),
        500..=599 => RemoteError::Transient(detail),
        _ => RemoteError::Unknown(detail),
    }
}

#[derive(Deserialize)]
struct RawClassification {
    #[serde(default)]
    is_meteor: bool,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Read the model's answer.
///
/// The JSON object between the first `{` and the last `}` wins. Without a
/// parseable object the text is searched for an affirmative mention of a
/// meteor, and confidence is `Low`.
pub fn parse_classification(text: &str) -> Classification {
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            if let Ok(raw) = serde_json::from_str::<RawClassification>(&text[start..=end]) {
                return Classification {
                    is_meteor: raw.is_meteor,
                    confidence: raw
                        .confidence
                        .as_deref()
                        .map(Confidence::parse)
                        .unwrap_or_default(),
                    description: raw.description.unwrap_or_default(),
                };
            }
        }
    }

    let lower = text.to_lowercase();
    let is_meteor = lower.contains("meteor")
        && (lower.contains("yes") || lower.contains("true") || lower.contains("is a meteor"));
    Classification {
        is_meteor,
        confidence: Confidence::Low,
        description: truncate(text, 200).to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_with_surrounding_text() {
        let c = parse_classification(
            "Sure.\n{\"is_meteor\": true, \"confidence\": \"high\", \"description\": \"bright streak\"}\nDone",
        );
        assert!(c.is_meteor);
        assert_eq!(c.confidence, Confidence::High);
        assert_eq!(c.description, "bright streak");
    }

    #[test]
    fn test_parse_keyword_fallback() {
        let c = parse_classification("Yes, this is a meteor crossing Orion.");
        assert!(c.is_meteor);
        assert_eq!(c.confidence, Confidence::Low);

        let c = parse_classification("No meteor here, only an aircraft.");
        assert!(!c.is_meteor);
    }

    #[test]
    fn test_status_mapping() {
        assert!(status_error(401, "").is_auth());
        assert!(status_error(403, "").is_auth());
        assert!(status_error(429, "").is_rate_limit());
        assert!(status_error(503, "").is_transient());
        assert!(matches!(status_error(400, "bad"), RemoteError::Unknown(_)));
    }

    #[test]
    fn test_api_key_plausibility() {
        assert!(!api_key_looks_valid(""));
        assert!(!api_key_looks_valid("your-api-key-here"));
        assert!(!api_key_looks_valid("short"));
        assert!(api_key_looks_valid("sk-ant-0123456789abcdef"));
    }
}
