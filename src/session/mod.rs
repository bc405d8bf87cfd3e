//! Exercise session core.
//!
//! This module is the heart of the application: the session aggregate and
//! its pure transitions ([`state`]), the intent/completion vocabulary
//! ([`event`]), the dictation bridge ([`dictation`]), and the async
//! orchestrator that owns the single source of truth ([`runner`]).
//!
//! # Architecture
//!
//! ```text
//! UserIntent (mpsc, from the shell)
//!        │
//!        ▼
//! SessionOrchestrator::run()  ← async tokio task
//!        │
//!        ├─ image / evaluation / transcription calls (spawned, seq-tagged)
//!        └─ capture start/stop (dedicated audio thread)
//!
//! SharedSession (Arc<Mutex<Session>>) ←─── read by the shell each frame
//! ```

pub mod dictation;
pub mod event;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use dictation::DictationBridge;
pub use event::{Completion, UserIntent};
pub use runner::SessionOrchestrator;
pub use state::{
    new_shared_session, validate_description, CaptureState, Phase, Session, SharedSession,
    ValidationError, MIN_DESCRIPTION_CHARS,
};
