//! Audio capture — microphone → mono 16 kHz accumulation → one WAV clip.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → AudioChunk (mpsc) → downmix_to_mono
//!           → resample → ClipBuffer → finalize() → AudioClip (WAV)
//! ```
//!
//! The recording lifecycle (device acquisition, accumulation, release) is
//! owned by [`RecordingController`]; the session orchestrator only sees the
//! [`CaptureDevice`] trait and the finalized [`AudioClip`].

pub mod capture;
pub mod clip;
pub mod recorder;
pub mod resample;

pub use capture::{AudioCapture, AudioChunk, CaptureError, StreamHandle};
pub use clip::{AudioClip, ClipBuffer, CLIP_MEDIA_TYPE};
pub use recorder::{CaptureDevice, RecordingController};
pub use resample::{downmix_to_mono, resample};
