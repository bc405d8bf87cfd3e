//! Session orchestrator — drives the whole exercise state machine.
//!
//! [`SessionOrchestrator`] owns the [`SharedSession`] and responds to
//! [`UserIntent`]s received over a `tokio::sync::mpsc` channel.
//!
//! # Event flow
//!
//! ```text
//! UserIntent (shell, mpsc)
//!        │
//!        ▼
//! SessionOrchestrator::run()  ← async tokio task
//!        │
//!        ├─ SelectTopic / RequestNewImage → spawn ImageService::generate
//!        ├─ Submit (validated)            → spawn EvaluationService::evaluate
//!        ├─ ToggleRecording               → CaptureDevice start/stop
//!        │                                  └─ stop → DictationBridge::submit
//!        └─ Reset / RetrySameImage / EditDescription → pure session mutation
//!
//! Completion (spawned tasks, internal mpsc, tagged with request token)
//!        │
//!        └─▶ stale-guard check → session mutation
//!
//! SharedSession (Arc<Mutex<Session>>) ←─── read by the shell each frame
//! ```
//!
//! # Ordering
//!
//! Queued intents are handled before pending completions (`biased` select),
//! and at most one image/evaluation call plus at most one dictation cycle is
//! ever in flight, so completions apply in the order their calls were
//! issued. A completion whose request token is no longer current — the user
//! reset or moved on while the call was airborne — is dropped without
//! touching the session.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::audio::CaptureDevice;
use crate::services::{EvaluationService, ImageService, TranscriptionService};
use crate::session::dictation::DictationBridge;
use crate::session::event::{Completion, UserIntent};
use crate::session::state::{validate_description, CaptureState, Phase, SharedSession};
use crate::topics;

// ---------------------------------------------------------------------------
// SessionOrchestrator
// ---------------------------------------------------------------------------

/// Drives one exercise session.
///
/// Create with [`SessionOrchestrator::new`], then call [`run`](Self::run)
/// inside a tokio task. `run` returns once the intent channel closes and
/// every in-flight call has completed (or gone stale).
pub struct SessionOrchestrator {
    session: SharedSession,
    images: Arc<dyn ImageService>,
    evaluator: Arc<dyn EvaluationService>,
    capture: Box<dyn CaptureDevice>,
    dictation: DictationBridge,
    completions_tx: mpsc::Sender<Completion>,
    completions_rx: mpsc::Receiver<Completion>,
    /// Spawned calls whose completions have not been received yet.
    in_flight: usize,
}

impl SessionOrchestrator {
    /// Create a new orchestrator.
    ///
    /// # Arguments
    ///
    /// * `session`     — shared session state (also read by the shell).
    /// * `images`      — image generation service.
    /// * `evaluator`   — description evaluation service.
    /// * `transcriber` — speech transcription service.
    /// * `capture`     — audio capture device (real or scripted).
    pub fn new(
        session: SharedSession,
        images: Arc<dyn ImageService>,
        evaluator: Arc<dyn EvaluationService>,
        transcriber: Arc<dyn TranscriptionService>,
        capture: Box<dyn CaptureDevice>,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::channel(32);
        let dictation = DictationBridge::new(transcriber, completions_tx.clone());

        Self {
            session,
            images,
            evaluator,
            capture,
            dictation,
            completions_tx,
            completions_rx,
            in_flight: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run the orchestrator until `intents_rx` closes and no call is in
    /// flight.
    pub async fn run(mut self, mut intents_rx: mpsc::Receiver<UserIntent>) {
        let mut intents_open = true;

        while intents_open || self.in_flight > 0 {
            tokio::select! {
                // Queued intents win over completions so a Reset fired while
                // a call is airborne always lands first.
                biased;

                intent = intents_rx.recv(), if intents_open => {
                    match intent {
                        Some(intent) => self.handle_intent(intent),
                        None => intents_open = false,
                    }
                }

                completion = self.completions_rx.recv(), if self.in_flight > 0 => {
                    // The orchestrator holds a sender, so recv() cannot
                    // yield None while anything is in flight.
                    if let Some(completion) = completion {
                        self.handle_completion(completion);
                    }
                }
            }
        }

        self.capture.abort();
        log::info!("session: intent channel closed, orchestrator shutting down");
    }

    // -----------------------------------------------------------------------
    // Intent handling
    // -----------------------------------------------------------------------

    fn handle_intent(&mut self, intent: UserIntent) {
        match intent {
            UserIntent::SelectTopic(id) => self.handle_select_topic(&id),
            UserIntent::EditDescription(text) => {
                self.session.lock().unwrap().edit_description(text);
            }
            UserIntent::ToggleRecording => self.handle_toggle_recording(),
            UserIntent::Submit => self.handle_submit(),
            UserIntent::RetrySameImage => self.handle_retry_same_image(),
            UserIntent::RequestNewImage => self.handle_request_new_image(),
            UserIntent::Reset => self.handle_reset(),
        }
    }

    fn handle_select_topic(&mut self, id: &str) {
        let mut session = self.session.lock().unwrap();

        // Duplicate start requests (e.g. a second click while generating)
        // are ignored rather than racing a second call.
        if session.phase != Phase::SelectingTopic {
            log::debug!("SelectTopic ignored in phase {:?}", session.phase);
            return;
        }

        let Some(topic) = topics::find(id) else {
            log::warn!("SelectTopic with unknown id {id:?} ignored");
            return;
        };

        session.begin_generation(topic);
        let seq = session.begin_request();
        drop(session);

        self.spawn_generation(topic.title, seq);
    }

    fn handle_request_new_image(&mut self) {
        let mut session = self.session.lock().unwrap();

        if session.phase != Phase::Describing || session.capture != CaptureState::Idle {
            log::debug!(
                "RequestNewImage ignored (phase {:?}, capture {:?})",
                session.phase,
                session.capture
            );
            return;
        }
        let Some(topic) = session.topic else {
            return;
        };

        session.begin_generation(topic);
        let seq = session.begin_request();
        drop(session);

        self.spawn_generation(topic.title, seq);
    }

    fn handle_toggle_recording(&mut self) {
        let mut session = self.session.lock().unwrap();

        if session.phase != Phase::Describing {
            log::debug!("ToggleRecording ignored in phase {:?}", session.phase);
            return;
        }

        match session.capture {
            CaptureState::Idle => match self.capture.start() {
                Ok(()) => session.begin_recording(),
                Err(e) => {
                    log::warn!("microphone unavailable: {e}");
                    session.error = Some(format!("No se pudo acceder al micrófono: {e}"));
                }
            },
            CaptureState::Recording => {
                // Flip to Transcribing before the bridge resolves so the UI
                // shows "processing" with no gap.
                session.begin_transcribing();
                match self.capture.stop() {
                    Ok(clip) => {
                        let seq = session.begin_request();
                        drop(session);
                        self.in_flight += 1;
                        self.dictation.submit(clip, seq);
                    }
                    Err(e) => {
                        log::warn!("recording failed: {e}");
                        session.capture_idle();
                        session.error = Some(format!("No se pudo grabar: {e}"));
                    }
                }
            }
            CaptureState::Transcribing => {
                log::debug!("ToggleRecording ignored while transcribing");
            }
        }
    }

    fn handle_submit(&mut self) {
        let mut session = self.session.lock().unwrap();

        if !session.can_submit() {
            log::debug!(
                "Submit rejected (phase {:?}, capture {:?})",
                session.phase,
                session.capture
            );
            return;
        }

        // Local validation: no phase change, no network.
        if let Err(e) = validate_description(&session.description) {
            session.error = Some(e.to_string());
            return;
        }

        let Some(image) = session.image.clone() else {
            log::warn!("Submit with no image — ignoring");
            return;
        };
        let Some(topic) = session.topic else {
            return;
        };
        let description = session.description.clone();

        session.begin_analysis();
        let seq = session.begin_request();
        drop(session);

        let evaluator = Arc::clone(&self.evaluator);
        let completions = self.completions_tx.clone();
        let title = topic.title.to_string();
        self.in_flight += 1;

        tokio::spawn(async move {
            let completion = match evaluator.evaluate(&image, &description, &title).await {
                Ok(feedback) => Completion::EvaluationReady { seq, feedback },
                Err(error) => Completion::EvaluationFailed { seq, error },
            };
            let _ = completions.send(completion).await;
        });
    }

    fn handle_retry_same_image(&mut self) {
        let mut session = self.session.lock().unwrap();
        if session.phase != Phase::ShowingFeedback {
            log::debug!("RetrySameImage ignored in phase {:?}", session.phase);
            return;
        }
        session.retry_same_image();
    }

    fn handle_reset(&mut self) {
        self.capture.abort();
        self.session.lock().unwrap().reset();
    }

    fn spawn_generation(&mut self, title: &'static str, seq: u64) {
        let images = Arc::clone(&self.images);
        let completions = self.completions_tx.clone();
        self.in_flight += 1;

        tokio::spawn(async move {
            let completion = match images.generate(title).await {
                Ok(image) => Completion::ImageReady { seq, image },
                Err(error) => Completion::ImageFailed { seq, error },
            };
            let _ = completions.send(completion).await;
        });
    }

    // -----------------------------------------------------------------------
    // Completion handling
    // -----------------------------------------------------------------------

    fn handle_completion(&mut self, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);

        let mut session = self.session.lock().unwrap();

        let seq = match &completion {
            Completion::ImageReady { seq, .. }
            | Completion::ImageFailed { seq, .. }
            | Completion::EvaluationReady { seq, .. }
            | Completion::EvaluationFailed { seq, .. }
            | Completion::TranscriptReady { seq, .. }
            | Completion::TranscriptFailed { seq, .. } => *seq,
        };

        // Stale-result guard: the session moved on (reset, new request)
        // while this call was airborne. Its result must not be applied.
        if !session.is_current(seq) {
            log::debug!("discarding stale completion (seq {seq})");
            return;
        }

        match completion {
            Completion::ImageReady { image, .. } => {
                session.image_ready(image);
            }
            Completion::ImageFailed { error, .. } => {
                log::warn!("image generation failed: {error}");
                let title = session.topic.map(|t| t.title).unwrap_or("el tema");
                session.image_failed(format!(
                    "No se pudo generar la imagen de \u{201c}{title}\u{201d}: {error}"
                ));
            }
            Completion::EvaluationReady { feedback, .. } => {
                session.evaluation_ready(feedback);
            }
            Completion::EvaluationFailed { error, .. } => {
                log::warn!("evaluation failed: {error}");
                session.evaluation_failed(format!("No se pudo evaluar la descripción: {error}"));
            }
            Completion::TranscriptReady { text, .. } => {
                session.merge_transcript(&text);
                session.capture_idle();
            }
            Completion::TranscriptFailed { error, .. } => {
                log::warn!("transcription failed: {error}");
                session.capture_idle();
                session.error = Some(format!("No se pudo transcribir la grabación: {error}"));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioClip, CaptureError};
    use crate::services::{
        EncodedImage, EvaluationError, FeedbackResult, GenerationError, ScoreBreakdown,
        TranscriptionError,
    };
    use crate::session::state::new_shared_session;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Image service that succeeds with "IMG1", "IMG2", … per call, or fails
    /// from call `fail_from` (1-based) on.
    struct ScriptedImages {
        calls: AtomicUsize,
        fail_from: usize,
    }

    impl ScriptedImages {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_from: usize::MAX,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_from: 1,
            }
        }

        fn failing_from(n: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_from: n,
            }
        }
    }

    #[async_trait]
    impl ImageService for ScriptedImages {
        async fn generate(&self, _topic_title: &str) -> Result<EncodedImage, GenerationError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.fail_from {
                return Err(GenerationError::EmptyResponse);
            }
            Ok(EncodedImage {
                data: format!("IMG{n}"),
                media_type: "image/png".into(),
            })
        }
    }

    /// Evaluator that counts calls and returns a fixed result (or fails).
    struct ScriptedEval {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl ScriptedEval {
        fn ok(calls: Arc<AtomicUsize>) -> Self {
            Self { calls, fail: false }
        }

        fn failing(calls: Arc<AtomicUsize>) -> Self {
            Self { calls, fail: true }
        }
    }

    fn fixed_feedback() -> FeedbackResult {
        FeedbackResult {
            score: 7.0,
            breakdown: Some(ScoreBreakdown {
                grammar: 6.0,
                vocabulary: 8.0,
                coherence: 7.0,
            }),
            advice: "Usa más conectores.".into(),
            corrections: vec![],
            suggested_vocabulary: vec!["el rascacielos".into()],
            coherence_note: "Coincide con la imagen.".into(),
        }
    }

    #[async_trait]
    impl EvaluationService for ScriptedEval {
        async fn evaluate(
            &self,
            _image: &EncodedImage,
            _description: &str,
            _topic_title: &str,
        ) -> Result<FeedbackResult, EvaluationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EvaluationError::EmptyResponse);
            }
            Ok(fixed_feedback())
        }
    }

    /// Transcriber with a fixed transcript (or failure) and a call counter.
    struct ScriptedStt {
        calls: Arc<AtomicUsize>,
        text: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl TranscriptionService for ScriptedStt {
        async fn transcribe(&self, clip: &AudioClip) -> Result<String, TranscriptionError> {
            assert!(!clip.bytes.is_empty(), "bridge must never see an empty clip");
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TranscriptionError::EmptyTranscript);
            }
            Ok(self.text.to_string())
        }
    }

    /// Scripted capture device: no hardware, deterministic clips.
    struct ScriptedCapture {
        fail_start: bool,
        recording: bool,
    }

    impl ScriptedCapture {
        fn new(fail_start: bool) -> Self {
            Self {
                fail_start,
                recording: false,
            }
        }
    }

    impl CaptureDevice for ScriptedCapture {
        fn start(&mut self) -> Result<(), CaptureError> {
            if self.fail_start {
                return Err(CaptureError::DeviceUnavailable);
            }
            self.recording = true;
            Ok(())
        }

        fn stop(&mut self) -> Result<AudioClip, CaptureError> {
            if !self.recording {
                return Err(CaptureError::EmptyClip);
            }
            self.recording = false;
            Ok(AudioClip {
                bytes: vec![0_u8; 128],
                media_type: "audio/wav",
                duration_secs: 2.0,
            })
        }

        fn abort(&mut self) {
            self.recording = false;
        }

        fn is_recording(&self) -> bool {
            self.recording
        }
    }

    // -----------------------------------------------------------------------
    // Harness
    // -----------------------------------------------------------------------

    /// Builds a fresh orchestrator over a persistent session for each batch
    /// of intents. `drive` returns only after every spawned call has
    /// completed, so assertions afterwards are deterministic.
    struct Harness {
        session: SharedSession,
        images: Arc<dyn ImageService>,
        evaluator: Arc<dyn EvaluationService>,
        transcriber: Arc<dyn TranscriptionService>,
        fail_capture: bool,
        eval_calls: Arc<AtomicUsize>,
        stt_calls: Arc<AtomicUsize>,
    }

    impl Harness {
        fn new() -> Self {
            let eval_calls = Arc::new(AtomicUsize::new(0));
            let stt_calls = Arc::new(AtomicUsize::new(0));
            Self {
                session: new_shared_session(),
                images: Arc::new(ScriptedImages::ok()),
                evaluator: Arc::new(ScriptedEval::ok(Arc::clone(&eval_calls))),
                transcriber: Arc::new(ScriptedStt {
                    calls: Arc::clone(&stt_calls),
                    text: "Hola mundo",
                    fail: false,
                }),
                fail_capture: false,
                eval_calls,
                stt_calls,
            }
        }

        async fn drive(&self, intents: Vec<UserIntent>) {
            let orchestrator = SessionOrchestrator::new(
                Arc::clone(&self.session),
                Arc::clone(&self.images),
                Arc::clone(&self.evaluator),
                Arc::clone(&self.transcriber),
                Box::new(ScriptedCapture::new(self.fail_capture)),
            );

            let (tx, rx) = mpsc::channel(16);
            for intent in intents {
                tx.send(intent).await.expect("queue intent");
            }
            drop(tx); // close the channel so run() returns

            orchestrator.run(rx).await;
        }

        fn with<T>(&self, f: impl FnOnce(&crate::session::state::Session) -> T) -> T {
            f(&self.session.lock().unwrap())
        }
    }

    const VALID_DESCRIPTION: &str = "Veo una ciudad moderna con mucha gente.";

    // -----------------------------------------------------------------------
    // Image generation
    // -----------------------------------------------------------------------

    /// Topic chosen → image service succeeds → Describing with the payload.
    #[tokio::test]
    async fn select_topic_generates_image_and_enters_describing() {
        let h = Harness::new();
        h.drive(vec![UserIntent::SelectTopic("tecnologia".into())])
            .await;

        h.with(|s| {
            assert_eq!(s.phase, Phase::Describing);
            assert_eq!(s.topic.unwrap().id, "tecnologia");
            assert_eq!(s.image.as_ref().unwrap().data, "IMG1");
            assert!(s.error.is_none());
        });
    }

    /// A second SelectTopic while the first is generating must not start a
    /// second call.
    #[tokio::test]
    async fn duplicate_select_while_generating_is_ignored() {
        let h = Harness::new();
        h.drive(vec![
            UserIntent::SelectTopic("tecnologia".into()),
            UserIntent::SelectTopic("ciudad".into()),
        ])
        .await;

        h.with(|s| {
            assert_eq!(s.phase, Phase::Describing);
            // First selection won; only one image was generated.
            assert_eq!(s.topic.unwrap().id, "tecnologia");
            assert_eq!(s.image.as_ref().unwrap().data, "IMG1");
        });
    }

    #[tokio::test]
    async fn unknown_topic_id_is_ignored() {
        let h = Harness::new();
        h.drive(vec![UserIntent::SelectTopic("no-such-topic".into())])
            .await;

        h.with(|s| {
            assert_eq!(s.phase, Phase::SelectingTopic);
            assert!(s.topic.is_none());
        });
    }

    /// Generation failure reverts to topic selection with the topic named in
    /// the error and the selection cleared.
    #[tokio::test]
    async fn image_failure_reverts_to_topic_selection() {
        let mut h = Harness::new();
        h.images = Arc::new(ScriptedImages::failing());
        h.drive(vec![UserIntent::SelectTopic("tecnologia".into())])
            .await;

        h.with(|s| {
            assert_eq!(s.phase, Phase::SelectingTopic);
            assert!(s.topic.is_none());
            assert!(s.image.is_none());
            let error = s.error.as_ref().expect("error message");
            assert!(error.contains("Tecnología"), "error names the topic: {error}");
        });
    }

    /// Reset while the image call is airborne: the late result is stale and
    /// must not mutate the session.
    #[tokio::test]
    async fn stale_image_result_after_reset_is_discarded() {
        let h = Harness::new();
        h.drive(vec![
            UserIntent::SelectTopic("tecnologia".into()),
            UserIntent::Reset,
        ])
        .await;

        h.with(|s| {
            assert_eq!(s.phase, Phase::SelectingTopic);
            assert!(s.topic.is_none());
            assert!(s.image.is_none());
            assert!(s.error.is_none());
        });
    }

    // -----------------------------------------------------------------------
    // Submission & evaluation
    // -----------------------------------------------------------------------

    /// "Corto." (7 chars) → local rejection: phase unchanged, error set, no
    /// evaluation call.
    #[tokio::test]
    async fn short_description_is_rejected_locally() {
        let h = Harness::new();
        h.drive(vec![UserIntent::SelectTopic("tecnologia".into())])
            .await;
        h.drive(vec![
            UserIntent::EditDescription("Corto.".into()),
            UserIntent::Submit,
        ])
        .await;

        h.with(|s| {
            assert_eq!(s.phase, Phase::Describing);
            assert!(s.error.is_some());
            assert!(s.feedback.is_none());
        });
        assert_eq!(h.eval_calls.load(Ordering::SeqCst), 0);
    }

    /// Valid submission stores the exact feedback the service returned.
    #[tokio::test]
    async fn valid_submission_shows_feedback() {
        let h = Harness::new();
        h.drive(vec![UserIntent::SelectTopic("tecnologia".into())])
            .await;
        h.drive(vec![
            UserIntent::EditDescription(VALID_DESCRIPTION.into()),
            UserIntent::Submit,
        ])
        .await;

        h.with(|s| {
            assert_eq!(s.phase, Phase::ShowingFeedback);
            assert_eq!(s.feedback, Some(fixed_feedback()));
            assert!(s.error.is_none());
        });
        assert_eq!(h.eval_calls.load(Ordering::SeqCst), 1);
    }

    /// Evaluation failure returns to Describing with the buffer intact.
    #[tokio::test]
    async fn evaluation_failure_returns_to_describing() {
        let mut h = Harness::new();
        h.evaluator = Arc::new(ScriptedEval::failing(Arc::clone(&h.eval_calls)));
        h.drive(vec![UserIntent::SelectTopic("tecnologia".into())])
            .await;
        h.drive(vec![
            UserIntent::EditDescription(VALID_DESCRIPTION.into()),
            UserIntent::Submit,
        ])
        .await;

        h.with(|s| {
            assert_eq!(s.phase, Phase::Describing);
            assert!(s.feedback.is_none());
            assert!(s.error.is_some());
            assert_eq!(s.description, VALID_DESCRIPTION);
        });
    }

    /// Reset while the evaluation is airborne: stale feedback is discarded.
    #[tokio::test]
    async fn stale_evaluation_result_after_reset_is_discarded() {
        let h = Harness::new();
        h.drive(vec![UserIntent::SelectTopic("tecnologia".into())])
            .await;
        h.drive(vec![
            UserIntent::EditDescription(VALID_DESCRIPTION.into()),
            UserIntent::Submit,
            UserIntent::Reset,
        ])
        .await;

        h.with(|s| {
            assert_eq!(s.phase, Phase::SelectingTopic);
            assert!(s.feedback.is_none());
        });
    }

    // -----------------------------------------------------------------------
    // Retry / new image
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn retry_same_image_clears_for_second_attempt() {
        let h = Harness::new();
        h.drive(vec![UserIntent::SelectTopic("tecnologia".into())])
            .await;
        h.drive(vec![
            UserIntent::EditDescription(VALID_DESCRIPTION.into()),
            UserIntent::Submit,
        ])
        .await;
        h.drive(vec![UserIntent::RetrySameImage]).await;

        h.with(|s| {
            assert_eq!(s.phase, Phase::Describing);
            assert_eq!(s.image.as_ref().unwrap().data, "IMG1");
            assert!(s.description.is_empty());
            assert!(s.feedback.is_none());
        });
    }

    #[tokio::test]
    async fn request_new_image_replaces_image_and_clears_description() {
        let h = Harness::new();
        h.drive(vec![UserIntent::SelectTopic("tecnologia".into())])
            .await;
        h.drive(vec![
            UserIntent::EditDescription(VALID_DESCRIPTION.into()),
            UserIntent::RequestNewImage,
        ])
        .await;

        h.with(|s| {
            assert_eq!(s.phase, Phase::Describing);
            assert_eq!(s.image.as_ref().unwrap().data, "IMG2");
            assert!(s.description.is_empty());
            assert_eq!(s.topic.unwrap().id, "tecnologia");
        });
    }

    #[tokio::test]
    async fn new_image_failure_reverts_to_topic_selection() {
        let mut h = Harness::new();
        h.images = Arc::new(ScriptedImages::failing_from(2));
        h.drive(vec![UserIntent::SelectTopic("tecnologia".into())])
            .await;
        h.drive(vec![UserIntent::RequestNewImage]).await;

        h.with(|s| {
            assert_eq!(s.phase, Phase::SelectingTopic);
            assert!(s.topic.is_none());
            assert!(s.image.is_none());
            assert!(s.error.is_some());
        });
    }

    // -----------------------------------------------------------------------
    // Dictation
    // -----------------------------------------------------------------------

    /// Record → stop → transcript lands in the empty buffer with no leading
    /// space, capture back to Idle, exactly one transcribe call.
    #[tokio::test]
    async fn dictation_merges_transcript_into_empty_buffer() {
        let h = Harness::new();
        h.drive(vec![UserIntent::SelectTopic("tecnologia".into())])
            .await;
        h.drive(vec![UserIntent::ToggleRecording, UserIntent::ToggleRecording])
            .await;

        h.with(|s| {
            assert_eq!(s.description, "Hola mundo");
            assert_eq!(s.capture, CaptureState::Idle);
            assert!(s.error.is_none());
        });
        assert_eq!(h.stt_calls.load(Ordering::SeqCst), 1);
    }

    /// Appending to a non-empty buffer inserts exactly one separating space.
    #[tokio::test]
    async fn dictation_appends_with_single_space() {
        let h = Harness::new();
        h.drive(vec![UserIntent::SelectTopic("tecnologia".into())])
            .await;
        h.drive(vec![
            UserIntent::EditDescription("Veo una plaza.".into()),
            UserIntent::ToggleRecording,
            UserIntent::ToggleRecording,
        ])
        .await;

        h.with(|s| {
            assert_eq!(s.description, "Veo una plaza. Hola mundo");
        });
    }

    /// Manual edits inside the Transcribing window are dropped, so the merge
    /// cannot clobber (or duplicate against) them.
    #[tokio::test]
    async fn manual_edit_during_transcription_window_is_ignored() {
        let h = Harness::new();
        h.drive(vec![UserIntent::SelectTopic("tecnologia".into())])
            .await;
        h.drive(vec![
            UserIntent::ToggleRecording,
            UserIntent::ToggleRecording,
            UserIntent::EditDescription("edición manual".into()),
        ])
        .await;

        h.with(|s| {
            assert_eq!(s.description, "Hola mundo");
        });
    }

    /// Submission while the capture is not Idle is rejected regardless of
    /// the buffer content.
    #[tokio::test]
    async fn submit_while_transcribing_is_rejected() {
        let h = Harness::new();
        h.drive(vec![UserIntent::SelectTopic("tecnologia".into())])
            .await;
        h.drive(vec![
            UserIntent::EditDescription(VALID_DESCRIPTION.into()),
            UserIntent::ToggleRecording,
            UserIntent::ToggleRecording,
            UserIntent::Submit, // arrives while Transcribing
        ])
        .await;

        h.with(|s| {
            assert_eq!(s.phase, Phase::Describing);
            assert!(s.feedback.is_none());
        });
        assert_eq!(h.eval_calls.load(Ordering::SeqCst), 0);
    }

    /// Transcription failure: buffer untouched, capture Idle, dictation-
    /// specific error reported.
    #[tokio::test]
    async fn transcription_failure_leaves_buffer_untouched() {
        let mut h = Harness::new();
        h.transcriber = Arc::new(ScriptedStt {
            calls: Arc::clone(&h.stt_calls),
            text: "",
            fail: true,
        });
        h.drive(vec![UserIntent::SelectTopic("tecnologia".into())])
            .await;
        h.drive(vec![
            UserIntent::EditDescription("Veo una plaza.".into()),
            UserIntent::ToggleRecording,
            UserIntent::ToggleRecording,
        ])
        .await;

        h.with(|s| {
            assert_eq!(s.description, "Veo una plaza.");
            assert_eq!(s.capture, CaptureState::Idle);
            let error = s.error.as_ref().expect("error message");
            assert!(error.contains("transcribir"), "dictation-specific: {error}");
        });
    }

    /// Device-access failure is terminal for the attempt: capture stays
    /// Idle and an error is reported. A later start may succeed.
    #[tokio::test]
    async fn device_unavailable_reports_error_and_stays_idle() {
        let mut h = Harness::new();
        h.fail_capture = true;
        h.drive(vec![UserIntent::SelectTopic("tecnologia".into())])
            .await;
        h.drive(vec![UserIntent::ToggleRecording]).await;

        h.with(|s| {
            assert_eq!(s.capture, CaptureState::Idle);
            assert!(s.error.as_ref().is_some_and(|e| e.contains("micrófono")));
        });
        assert_eq!(h.stt_calls.load(Ordering::SeqCst), 0);
    }

    /// Recording is only reachable from the Describing phase.
    #[tokio::test]
    async fn toggle_recording_outside_describing_is_ignored() {
        let h = Harness::new();
        h.drive(vec![UserIntent::ToggleRecording]).await;

        h.with(|s| {
            assert_eq!(s.capture, CaptureState::Idle);
            assert!(s.error.is_none());
        });
    }

    // -----------------------------------------------------------------------
    // Reset
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn reset_from_feedback_clears_the_whole_session() {
        let h = Harness::new();
        h.drive(vec![UserIntent::SelectTopic("tecnologia".into())])
            .await;
        h.drive(vec![
            UserIntent::EditDescription(VALID_DESCRIPTION.into()),
            UserIntent::Submit,
        ])
        .await;
        h.drive(vec![UserIntent::Reset]).await;

        h.with(|s| {
            assert_eq!(s.phase, Phase::SelectingTopic);
            assert!(s.topic.is_none());
            assert!(s.image.is_none());
            assert!(s.description.is_empty());
            assert!(s.feedback.is_none());
            assert!(s.error.is_none());
            assert_eq!(s.capture, CaptureState::Idle);
        });
    }
}
