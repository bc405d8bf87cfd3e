//! Description evaluation service — `EvaluationService` trait, the
//! [`FeedbackResult`] value it produces, and the OpenAI-compatible
//! `ApiEvaluationService` implementation.
//!
//! The evaluator receives the generated image (as a `data:` URL content
//! part), the learner's description and the topic title, and returns a
//! structured rubric result: overall score, per-dimension breakdown, general
//! advice, grammar corrections, suggested vocabulary, and a coherence remark
//! tying the description back to the image.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ServicesConfig;
use crate::services::image::EncodedImage;

// ---------------------------------------------------------------------------
// FeedbackResult
// ---------------------------------------------------------------------------

/// Per-dimension scores, each 0–10.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoreBreakdown {
    pub grammar: f32,
    pub vocabulary: f32,
    pub coherence: f32,
}

/// One grammar-correction item.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GrammarCorrection {
    /// The erroneous fragment as the learner wrote it.
    pub error: String,
    /// The corrected fragment.
    pub correction: String,
    /// Why the correction applies.
    pub explanation: String,
}

/// Immutable evaluation result for one submitted description.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedbackResult {
    /// Overall score, 0–10.
    pub score: f32,
    /// Optional per-dimension breakdown.
    #[serde(default)]
    pub breakdown: Option<ScoreBreakdown>,
    /// General advice text.
    #[serde(default)]
    pub advice: String,
    /// Ordered grammar corrections.
    #[serde(default)]
    pub corrections: Vec<GrammarCorrection>,
    /// Ordered recommended vocabulary.
    #[serde(default)]
    pub suggested_vocabulary: Vec<String>,
    /// Remark on whether the description matches the image content.
    #[serde(default)]
    pub coherence_note: String,
}

fn clamp_score(value: f32) -> f32 {
    value.clamp(0.0, 10.0)
}

impl FeedbackResult {
    /// Clamp all scores into the 0–10 range the rest of the system assumes.
    ///
    /// The model occasionally scores outside the rubric despite the prompt;
    /// the session stores only sanitized results.
    pub fn sanitized(mut self) -> Self {
        self.score = clamp_score(self.score);
        if let Some(ref mut b) = self.breakdown {
            b.grammar = clamp_score(b.grammar);
            b.vocabulary = clamp_score(b.vocabulary);
            b.coherence = clamp_score(b.coherence);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// EvaluationError
// ---------------------------------------------------------------------------

/// Errors that can occur during description evaluation.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// HTTP transport or connection error.
    #[error("evaluation request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("evaluation timed out")]
    Timeout,

    /// The service answered with an error status.
    #[error("evaluation service rejected the request: {0}")]
    Api(String),

    /// The response (or the rubric JSON inside it) could not be parsed.
    #[error("failed to parse evaluation response: {0}")]
    Parse(String),

    /// The service returned a response with no usable content.
    #[error("evaluation service returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for EvaluationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            EvaluationError::Timeout
        } else {
            EvaluationError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// EvaluationService trait
// ---------------------------------------------------------------------------

/// Async interface for evaluating a description against its image.
///
/// Implementors must be `Send + Sync` so they can be shared across threads
/// (e.g. wrapped in `Arc<dyn EvaluationService>`).
#[async_trait]
pub trait EvaluationService: Send + Sync {
    /// Evaluate `description` for the image generated under `topic_title`.
    async fn evaluate(
        &self,
        image: &EncodedImage,
        description: &str,
        topic_title: &str,
    ) -> Result<FeedbackResult, EvaluationError>;
}

// ---------------------------------------------------------------------------
// ApiEvaluationService
// ---------------------------------------------------------------------------

/// Wire format of a chat-completions response (only what we read).
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: String,
}

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint with a vision
/// message and a strict-JSON rubric prompt.
pub struct ApiEvaluationService {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    language: String,
}

impl ApiEvaluationService {
    /// Build an `ApiEvaluationService` from application config.
    pub fn from_config(config: &ServicesConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.resolved_api_key(),
            model: config.eval_model.clone(),
            language: config.language.clone(),
        }
    }

    /// The rubric the evaluator must follow, as a system prompt.
    fn rubric(&self) -> String {
        format!(
            r#"You are an oral-exam examiner for learners of the language with ISO code "{lang}".
The student was shown an image and asked to describe it in that language.

Evaluate the description STRICTLY against the image and reply with ONLY a JSON object:
{{
  "score": <overall 0-10>,
  "breakdown": {{"grammar": <0-10>, "vocabulary": <0-10>, "coherence": <0-10>}},
  "advice": "<one short paragraph of general advice>",
  "corrections": [
    {{"error": "<fragment as written>", "correction": "<fixed fragment>", "explanation": "<why>"}}
  ],
  "suggested_vocabulary": ["<useful word or phrase>", ...],
  "coherence_note": "<one sentence on whether the description matches what the image shows>"
}}

Rules:
- "corrections" lists real grammar errors only; an empty array is fine.
- "suggested_vocabulary" names words that would have enriched this description.
- Score coherence against the actual image content, not plausibility.
- Do NOT add any text outside the JSON object."#,
            lang = self.language
        )
    }
}

#[async_trait]
impl EvaluationService for ApiEvaluationService {
    async fn evaluate(
        &self,
        image: &EncodedImage,
        description: &str,
        topic_title: &str,
    ) -> Result<FeedbackResult, EvaluationError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let user_text =
            format!("Topic: {topic_title}\n\nStudent description:\n{description}");

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.rubric() },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": user_text },
                        { "type": "image_url", "image_url": { "url": image.data_url() } }
                    ]
                }
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.2
        });

        let mut req = self.client.post(&url).json(&body);

        if let Some(key) = self.api_key.as_deref() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EvaluationError::Api(format!("{status}: {detail}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| EvaluationError::Parse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(EvaluationError::EmptyResponse)?;

        let feedback: FeedbackResult = serde_json::from_str(content.trim())
            .map_err(|e| EvaluationError::Parse(format!("rubric JSON: {e}")))?;

        Ok(feedback.sanitized())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
