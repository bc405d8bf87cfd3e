//! describelo — guided picture-description practice for oral exams.
//!
//! The learner picks a topic, an image is generated for it, they describe
//! it by typing and/or dictating, and a structured evaluation comes back:
//! score, per-dimension breakdown, grammar corrections, vocabulary
//! suggestions and a coherence remark.
//!
//! Crate layout:
//!
//! * [`session`] — the exercise state machine and its orchestrator (the
//!   core of the application).
//! * [`audio`] — microphone capture lifecycle and clip encoding.
//! * [`services`] — reqwest clients for the image, evaluation and
//!   transcription services, behind async traits.
//! * [`topics`] — the static topic catalog.
//! * [`config`] — TOML settings and platform paths.
//! * [`app`] — the thin egui shell (renders the session, emits intents).

pub mod app;
pub mod audio;
pub mod config;
pub mod services;
pub mod session;
pub mod topics;
