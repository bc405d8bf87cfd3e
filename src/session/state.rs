//! Session aggregate and pure phase transitions.
//!
//! [`Session`] is the single source of truth for one exercise: current
//! phase, chosen topic, generated image, description buffer, feedback and
//! error state. The orchestrator mutates it through the small synchronous
//! transition methods below; the UI reads it via [`SharedSession`] to render
//! the appropriate view.
//!
//! Keeping every transition a plain method on the aggregate (no I/O, no
//! channels) makes the whole state machine testable without a rendering
//! environment or a runtime.
//!
//! [`SharedSession`] is a type alias for `Arc<Mutex<Session>>` — cheap to
//! clone and safe to share across threads.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::services::{EncodedImage, FeedbackResult};
use crate::topics::Topic;

/// Minimum description length (characters, after trimming) accepted for
/// submission.
pub const MIN_DESCRIPTION_CHARS: usize = 10;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Phases of the description exercise.
///
/// ```text
/// SelectingTopic ──topic chosen──▶ GeneratingImage ──image ready──▶ Describing
///                 ◀──image failed──┘                                  │
///        ▲                                                   submit   │
///        │                                                            ▼
///        │                    ◀──evaluation failed── Analyzing ──ok──▶ ShowingFeedback
///        └──────── reset (from any phase) ◀───────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the user to pick a topic from the catalog.
    SelectingTopic,
    /// Image generation is in flight.
    GeneratingImage,
    /// The image is shown; the user types and/or dictates a description.
    Describing,
    /// The evaluation call is in flight.
    Analyzing,
    /// Feedback for the last submission is on screen.
    ShowingFeedback,
}

impl Phase {
    /// Returns `true` while an external call is in flight.
    ///
    /// The UI uses this to show a spinner and withhold every control that
    /// could start a second call.
    pub fn is_busy(&self) -> bool {
        matches!(self, Phase::GeneratingImage | Phase::Analyzing)
    }
}

// ---------------------------------------------------------------------------
// CaptureState
// ---------------------------------------------------------------------------

/// Lifecycle of the dictation input, mutually exclusive by construction.
///
/// Submission is disallowed whenever this is not [`CaptureState::Idle`], and
/// the description buffer accepts manual edits only outside
/// [`CaptureState::Transcribing`] — which is what makes the buffer's two
/// writers (user and transcript merge) temporally disjoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// No recording activity.
    Idle,
    /// The microphone is live and accumulating the clip.
    Recording,
    /// The clip is at the transcription service; result pending.
    Transcribing,
}

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// Local (non-network) rejection of a submission.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Trimmed description is below [`MIN_DESCRIPTION_CHARS`].
    #[error("La descripción es demasiado corta (mínimo 10 caracteres).")]
    TooShort,
}

/// Check a description against the submission rules.
pub fn validate_description(text: &str) -> Result<(), ValidationError> {
    if text.trim().chars().count() < MIN_DESCRIPTION_CHARS {
        return Err(ValidationError::TooShort);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The mutable aggregate for one exercise session.
///
/// Owned by the orchestrator; the shell holds a [`SharedSession`] and only
/// reads. All session state is in-memory and dies with the process.
pub struct Session {
    /// Current phase of the exercise.
    pub phase: Phase,
    /// Chosen topic; `None` until selection, cleared on reset.
    pub topic: Option<&'static Topic>,
    /// Generated image; present exactly while a topic's image is available.
    pub image: Option<EncodedImage>,
    /// The description buffer — typed by the user, appended to by the
    /// transcript merge.
    pub description: String,
    /// Evaluation result; `Some` iff `phase == ShowingFeedback`.
    pub feedback: Option<FeedbackResult>,
    /// User-facing error for the last failed operation, cleared at the start
    /// of every new attempt.
    pub error: Option<String>,
    /// Dictation lifecycle state.
    pub capture: CaptureState,
    /// Stale-result guard: bumped on every issued request and on reset, so a
    /// completion from an abandoned request can be recognised and dropped.
    request_seq: u64,
    /// Bumped whenever the *orchestrator* rewrites the description buffer
    /// (transcript merge, retry, reset, new generation) — never on manual
    /// edits. The shell watches this to know when to reload its local
    /// editing buffer without clobbering in-progress typing.
    buffer_epoch: u64,
}

impl Session {
    /// A fresh session at the topic-selection phase.
    pub fn new() -> Self {
        Self {
            phase: Phase::SelectingTopic,
            topic: None,
            image: None,
            description: String::new(),
            feedback: None,
            error: None,
            capture: CaptureState::Idle,
            request_seq: 0,
            buffer_epoch: 0,
        }
    }

    // ── Stale-result guard ───────────────────────────────────────────────

    /// Issue a new request token. Any completion carrying an older token is
    /// stale.
    pub fn begin_request(&mut self) -> u64 {
        self.request_seq += 1;
        self.request_seq
    }

    /// Whether a completion token is still the current one.
    pub fn is_current(&self, seq: u64) -> bool {
        self.request_seq == seq
    }

    /// Current description-buffer epoch (see the field doc).
    pub fn buffer_epoch(&self) -> u64 {
        self.buffer_epoch
    }

    // ── Image generation ─────────────────────────────────────────────────

    /// Enter image generation for `topic`, clearing the previous attempt's
    /// image, description, feedback and error.
    pub fn begin_generation(&mut self, topic: &'static Topic) {
        self.phase = Phase::GeneratingImage;
        self.topic = Some(topic);
        self.image = None;
        self.description.clear();
        self.buffer_epoch += 1;
        self.feedback = None;
        self.error = None;
    }

    /// Image generation succeeded.
    pub fn image_ready(&mut self, image: EncodedImage) {
        self.image = Some(image);
        self.phase = Phase::Describing;
    }

    /// Image generation failed: report and fall back to topic selection.
    ///
    /// The topic reference is dropped here — it was retained only long
    /// enough for the caller to phrase `message` with its title.
    pub fn image_failed(&mut self, message: String) {
        self.error = Some(message);
        self.topic = None;
        self.image = None;
        self.phase = Phase::SelectingTopic;
    }

    // ── Description & dictation ──────────────────────────────────────────

    /// Replace the description with a manual edit from the shell.
    ///
    /// Ignored while a transcript merge is pending (`Transcribing`), so the
    /// merge can never clobber — or be clobbered by — a manual edit.
    pub fn edit_description(&mut self, text: String) {
        if self.capture == CaptureState::Transcribing {
            log::debug!("manual edit ignored while transcribing");
            return;
        }
        self.description = text;
    }

    /// Append a transcript to the description buffer.
    ///
    /// Exactly one space separates it from existing content; an empty buffer
    /// gets the transcript verbatim.
    pub fn merge_transcript(&mut self, text: &str) {
        if self.description.is_empty() {
            self.description.push_str(text);
        } else {
            self.description.push(' ');
            self.description.push_str(text);
        }
        self.buffer_epoch += 1;
    }

    /// The microphone is live.
    pub fn begin_recording(&mut self) {
        self.capture = CaptureState::Recording;
        self.error = None;
    }

    /// The clip has been handed to the transcription service.
    pub fn begin_transcribing(&mut self) {
        self.capture = CaptureState::Transcribing;
    }

    /// Dictation finished (successfully or not).
    pub fn capture_idle(&mut self) {
        self.capture = CaptureState::Idle;
    }

    // ── Evaluation ───────────────────────────────────────────────────────

    /// Whether a submission would currently be accepted.
    pub fn can_submit(&self) -> bool {
        self.phase == Phase::Describing && self.capture == CaptureState::Idle
    }

    /// Enter evaluation, clearing the previous error.
    pub fn begin_analysis(&mut self) {
        self.phase = Phase::Analyzing;
        self.error = None;
    }

    /// Evaluation succeeded.
    pub fn evaluation_ready(&mut self, feedback: FeedbackResult) {
        self.feedback = Some(feedback);
        self.phase = Phase::ShowingFeedback;
    }

    /// Evaluation failed: report and return to the description editor with
    /// the buffer intact.
    pub fn evaluation_failed(&mut self, message: String) {
        self.error = Some(message);
        self.phase = Phase::Describing;
    }

    /// Keep the image, clear description and feedback, describe again.
    pub fn retry_same_image(&mut self) {
        self.description.clear();
        self.buffer_epoch += 1;
        self.feedback = None;
        self.error = None;
        self.phase = Phase::Describing;
    }

    // ── Reset ────────────────────────────────────────────────────────────

    /// Discard the whole session and return to topic selection.
    ///
    /// Bumps the request token so any in-flight completion is recognised as
    /// stale when it eventually lands.
    pub fn reset(&mut self) {
        self.request_seq += 1;
        self.phase = Phase::SelectingTopic;
        self.topic = None;
        self.image = None;
        self.description.clear();
        self.buffer_epoch += 1;
        self.feedback = None;
        self.error = None;
        self.capture = CaptureState::Idle;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// SharedSession
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`Session`].
///
/// Cheap to clone (`Arc` clone). Lock with `.lock().unwrap()` for a short
/// critical section; do **not** hold the lock across `.await` points.
pub type SharedSession = Arc<Mutex<Session>>;

/// Construct a new [`SharedSession`] wrapping a fresh [`Session`].
pub fn new_shared_session() -> SharedSession {
    Arc::new(Mutex::new(Session::new()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
