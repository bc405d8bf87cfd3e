//! Message vocabulary between the shell, the orchestrator, and its spawned
//! service calls.

use crate::services::{
    EncodedImage, EvaluationError, FeedbackResult, GenerationError, TranscriptionError,
};

// ---------------------------------------------------------------------------
// UserIntent
// ---------------------------------------------------------------------------

/// Discrete intents emitted by the presentation shell.
///
/// The shell is expected not to offer a control whose intent is unreachable
/// in the current phase, but the orchestrator still guards every variant so
/// a stray intent is ignored rather than corrupting the session.
#[derive(Debug, Clone)]
pub enum UserIntent {
    /// A topic card was chosen (carries the topic id).
    SelectTopic(String),
    /// The description text field changed.
    EditDescription(String),
    /// The record button was pressed (starts or stops dictation).
    ToggleRecording,
    /// The description was submitted for evaluation.
    Submit,
    /// Describe the same image again.
    RetrySameImage,
    /// Generate a fresh image for the current topic.
    RequestNewImage,
    /// Abandon the session and return to topic selection.
    Reset,
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// Results of spawned external calls, funneled back into the orchestrator's
/// event loop.
///
/// Every variant carries the request token (`seq`) captured when the call
/// was issued; the orchestrator drops any completion whose token is no
/// longer current (the session was reset or moved on in the meantime).
#[derive(Debug)]
pub enum Completion {
    ImageReady { seq: u64, image: EncodedImage },
    ImageFailed { seq: u64, error: GenerationError },
    EvaluationReady { seq: u64, feedback: FeedbackResult },
    EvaluationFailed { seq: u64, error: EvaluationError },
    TranscriptReady { seq: u64, text: String },
    TranscriptFailed { seq: u64, error: TranscriptionError },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_are_cloneable_for_the_shell() {
        let intent = UserIntent::SelectTopic("ciudad".into());
        let copy = intent.clone();
        assert!(matches!(copy, UserIntent::SelectTopic(id) if id == "ciudad"));
    }
}
