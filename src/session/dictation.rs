//! Dictation bridge — one finalized clip in, one transcript completion out.
//!
//! [`DictationBridge`] owns the hop between the capture controller and the
//! transcription service: it takes the encoded clip produced by a stopped
//! recording, calls the service in a spawned task, and delivers the outcome
//! back into the orchestrator's completion queue tagged with the request
//! token it was given.
//!
//! The bridge never touches the session itself — the orchestrator applies
//! the merge (or the error) when the completion arrives, which keeps the
//! capture-state ordering guarantee in one place.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::audio::AudioClip;
use crate::services::TranscriptionService;
use crate::session::event::Completion;

/// Spawns transcription calls and reports their completions.
pub struct DictationBridge {
    service: Arc<dyn TranscriptionService>,
    completions: mpsc::Sender<Completion>,
}

impl DictationBridge {
    /// Create a bridge that reports into `completions`.
    pub fn new(
        service: Arc<dyn TranscriptionService>,
        completions: mpsc::Sender<Completion>,
    ) -> Self {
        Self {
            service,
            completions,
        }
    }

    /// Transcribe `clip`, reporting the outcome with the given request token.
    ///
    /// Returns immediately; the actual call runs on a spawned task. Must be
    /// called from within a tokio runtime.
    pub fn submit(&self, clip: AudioClip, seq: u64) {
        log::debug!(
            "submitting {:.1}s clip ({} bytes) for transcription",
            clip.duration_secs,
            clip.bytes.len()
        );

        let service = Arc::clone(&self.service);
        let completions = self.completions.clone();

        tokio::spawn(async move {
            let completion = match service.transcribe(&clip).await {
                Ok(text) => Completion::TranscriptReady { seq, text },
                Err(error) => Completion::TranscriptFailed { seq, error },
            };
            // Receiver gone means the orchestrator is shutting down.
            let _ = completions.send(completion).await;
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
