//! External service clients.
//!
//! Each of the three collaborators the exercise depends on is an async trait
//! plus a reqwest-backed implementation speaking the OpenAI-compatible wire
//! format:
//!
//! * [`ImageService`] / [`ApiImageService`] — `/v1/images/generations`
//! * [`EvaluationService`] / [`ApiEvaluationService`] — `/v1/chat/completions`
//!   with the exercise image attached as a `data:` URL
//! * [`TranscriptionService`] / [`ApiTranscriptionService`] —
//!   `/v1/audio/transcriptions` (multipart WAV upload)
//!
//! The orchestrator only ever sees the traits, so tests drive it with
//! scripted doubles and no network.

pub mod evaluation;
pub mod image;
pub mod transcription;

pub use evaluation::{
    ApiEvaluationService, EvaluationError, EvaluationService, FeedbackResult, GrammarCorrection,
    ScoreBreakdown,
};
pub use image::{ApiImageService, EncodedImage, GenerationError, ImageService};
pub use transcription::{ApiTranscriptionService, TranscriptionError, TranscriptionService};
