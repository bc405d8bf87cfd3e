//! Image generation service — `ImageService` trait and the OpenAI-compatible
//! `ApiImageService` implementation.
//!
//! All connection details come from [`ServicesConfig`]; nothing is hardcoded
//! beyond the `/v1/images/generations` route, so any compatible provider
//! works.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ServicesConfig;

// ---------------------------------------------------------------------------
// EncodedImage
// ---------------------------------------------------------------------------

/// An opaque generated-image payload: base64 data plus its media type.
///
/// The shell decodes it for display; the evaluation service embeds it as a
/// `data:` URL.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    /// Base64-encoded image bytes.
    pub data: String,
    /// Media type of the decoded bytes (e.g. `image/png`).
    pub media_type: String,
}

impl EncodedImage {
    /// Render as a `data:` URL (the form vision-capable chat endpoints
    /// expect for inline images).
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }

    /// Decode the raw image bytes (for the shell's texture upload).
    pub fn decode(&self) -> Option<Vec<u8>> {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;
        STANDARD.decode(&self.data).ok()
    }
}

// ---------------------------------------------------------------------------
// GenerationError
// ---------------------------------------------------------------------------

/// Errors that can occur during image generation.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// HTTP transport or connection error.
    #[error("image request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("image generation timed out")]
    Timeout,

    /// The service answered with an error status (quota, content policy, …).
    #[error("image service rejected the request: {0}")]
    Api(String),

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse image response: {0}")]
    Parse(String),

    /// The service returned a response with no image payload.
    #[error("image service returned no image")]
    EmptyResponse,
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GenerationError::Timeout
        } else {
            GenerationError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// ImageService trait
// ---------------------------------------------------------------------------

/// Async interface for generating the exercise image.
///
/// Implementors must be `Send + Sync` so they can be shared across threads
/// (e.g. wrapped in `Arc<dyn ImageService>`).
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Generate one image for the given topic title.
    async fn generate(&self, topic_title: &str) -> Result<EncodedImage, GenerationError>;
}

// ---------------------------------------------------------------------------
// ApiImageService
// ---------------------------------------------------------------------------

/// Wire format of a successful `/v1/images/generations` response.
#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

/// Calls an OpenAI-compatible `/v1/images/generations` endpoint.
pub struct ApiImageService {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl ApiImageService {
    /// Build an `ApiImageService` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`. A default (no-timeout) client is used as a
    /// last-resort fallback if the builder fails (should never happen in
    /// practice).
    pub fn from_config(config: &ServicesConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.resolved_api_key(),
            model: config.image_model.clone(),
        }
    }

    /// Build the generation prompt for a topic title.
    ///
    /// The image must carry enough describable detail for an oral exercise
    /// and no embedded text the learner could simply read out.
    fn prompt(topic_title: &str) -> String {
        format!(
            "A rich, realistic scene for the theme \"{topic_title}\", with \
             several distinct people, objects or activities worth describing \
             aloud. No text, captions or watermarks in the image."
        )
    }
}

#[async_trait]
impl ImageService for ApiImageService {
    async fn generate(&self, topic_title: &str) -> Result<EncodedImage, GenerationError> {
        let url = format!("{}/v1/images/generations", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "prompt": Self::prompt(topic_title),
            "n": 1,
            "size": "1024x1024",
        });

        let mut req = self.client.post(&url).json(&body);

        // Attach Authorization header only when a key is configured.
        if let Some(key) = self.api_key.as_deref() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api(format!("{status}: {detail}")));
        }

        let parsed: ImagesResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        let b64 = parsed
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .filter(|d| !d.is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        Ok(EncodedImage {
            data: b64,
            media_type: "image/png".into(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_builds_without_panic() {
        let config = ServicesConfig::default();
        let _service = ApiImageService::from_config(&config);
    }

    /// Verify that `ApiImageService` is object-safe (usable as
    /// `dyn ImageService`).
    #[test]
    fn service_is_object_safe() {
        let config = ServicesConfig::default();
        let service: Box<dyn ImageService> = Box::new(ApiImageService::from_config(&config));
        drop(service);
    }

    #[test]
    fn prompt_includes_topic_and_forbids_text() {
        let prompt = ApiImageService::prompt("La Ciudad");
        assert!(prompt.contains("La Ciudad"));
        assert!(prompt.contains("No text"));
    }

    #[test]
    fn data_url_format() {
        let image = EncodedImage {
            data: "aGVsbG8=".into(), // "hello"
            media_type: "image/png".into(),
        };
        assert_eq!(image.data_url(), "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn decode_round_trips_base64() {
        let image = EncodedImage {
            data: "aGVsbG8=".into(),
            media_type: "image/png".into(),
        };
        assert_eq!(image.decode().as_deref(), Some(b"hello".as_slice()));
    }

    #[test]
    fn decode_invalid_base64_is_none() {
        let image = EncodedImage {
            data: "!!not-base64!!".into(),
            media_type: "image/png".into(),
        };
        assert!(image.decode().is_none());
    }

    #[test]
    fn images_response_wire_format_parses() {
        let raw = r#"{"created": 1, "data": [{"b64_json": "QUJD"}]}"#;
        let parsed: ImagesResponse = serde_json::from_str(raw).expect("parse");
        assert_eq!(parsed.data[0].b64_json.as_deref(), Some("QUJD"));
    }
}
