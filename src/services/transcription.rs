//! Speech transcription service — `TranscriptionService` trait and the
//! OpenAI-compatible `ApiTranscriptionService` implementation.
//!
//! The finalized WAV clip is uploaded as multipart form data (carrying its
//! media type) to `/v1/audio/transcriptions`; the response is the plain
//! transcript text.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::audio::AudioClip;
use crate::config::ServicesConfig;

// ---------------------------------------------------------------------------
// TranscriptionError
// ---------------------------------------------------------------------------

/// Errors that can occur during transcription.
///
/// Deliberately distinct from [`crate::services::GenerationError`] and
/// [`crate::services::EvaluationError`] so the session can phrase dictation
/// failures differently from submission failures.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// HTTP transport or connection error.
    #[error("transcription request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("transcription timed out")]
    Timeout,

    /// The service answered with an error status.
    #[error("transcription service rejected the clip: {0}")]
    Api(String),

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse transcription response: {0}")]
    Parse(String),

    /// The service produced no text (e.g. the clip was silence).
    #[error("no speech recognised in the recording")]
    EmptyTranscript,
}

impl From<reqwest::Error> for TranscriptionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranscriptionError::Timeout
        } else {
            TranscriptionError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// TranscriptionService trait
// ---------------------------------------------------------------------------

/// Async interface for converting one encoded clip into text.
///
/// Implementors must be `Send + Sync` so they can be shared across threads
/// (e.g. wrapped in `Arc<dyn TranscriptionService>`).
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Transcribe `clip` and return the recognised text.
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, TranscriptionError>;
}

// ---------------------------------------------------------------------------
// ApiTranscriptionService
// ---------------------------------------------------------------------------

/// Wire format of a successful `/v1/audio/transcriptions` response.
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Calls an OpenAI-compatible `/v1/audio/transcriptions` endpoint.
pub struct ApiTranscriptionService {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    language: String,
}

impl ApiTranscriptionService {
    /// Build an `ApiTranscriptionService` from application config.
    pub fn from_config(config: &ServicesConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.resolved_api_key(),
            model: config.stt_model.clone(),
            language: config.language.clone(),
        }
    }
}

#[async_trait]
impl TranscriptionService for ApiTranscriptionService {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, TranscriptionError> {
        let url = format!("{}/v1/audio/transcriptions", self.base_url);

        let file_part = reqwest::multipart::Part::bytes(clip.bytes.clone())
            .file_name("clip.wav")
            .mime_str(clip.media_type)
            .map_err(|e| TranscriptionError::Request(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("language", self.language.clone());

        let mut req = self.client.post(&url).multipart(form);

        if let Some(key) = self.api_key.as_deref() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::Api(format!("{status}: {detail}")));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| TranscriptionError::Parse(e.to_string()))?;

        let text = parsed.text.trim().to_string();
        if text.is_empty() {
            return Err(TranscriptionError::EmptyTranscript);
        }

        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
