//! Recording lifecycle controller.
//!
//! [`RecordingController`] owns the live recording: `start()` acquires the
//! input device, `stop()` releases it and yields the finalized clip.
//!
//! cpal streams are not `Send`, so the stream lives on a dedicated
//! `audio-capture` thread for its entire life. The controller talks to that
//! thread over std mpsc channels:
//!
//! ```text
//! start() ──spawn──▶ worker: open device → play stream ──ready──▶ start() returns
//!                     │  chunks → downmix → resample → ClipBuffer
//! stop()  ──signal──▶ │  drop(stream)  (device released, indicator off)
//!                     └──finalized AudioClip──▶ stop() returns
//! ```
//!
//! Device acquisition is handshaked synchronously: `start()` does not return
//! until the worker has either played the stream or failed, so a
//! [`CaptureError::DeviceUnavailable`] surfaces immediately and the capture
//! state never leaves Idle on failure. Dropping the controller (or calling
//! [`RecordingController::abort`]) ends the worker the same way — the stream
//! is dropped on every exit path.

use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

use super::capture::{AudioCapture, CaptureError};
use super::clip::{AudioClip, ClipBuffer};
use super::resample::{downmix_to_mono, resample};

/// How long `stop()` waits for the worker to hand back the clip.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// CaptureDevice trait
// ---------------------------------------------------------------------------

/// Interface between the session orchestrator and the audio hardware.
///
/// The production implementation is [`RecordingController`]; tests substitute
/// a scripted double so the orchestrator can be exercised without a
/// microphone.
pub trait CaptureDevice: Send {
    /// Acquire the device and begin capturing.
    ///
    /// A `start()` while already recording is ignored (the device is never
    /// acquired twice). On failure the device is not held and no recording
    /// is active.
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Stop capturing, release the device, and return the finalized clip.
    fn stop(&mut self) -> Result<AudioClip, CaptureError>;

    /// Stop capturing and discard whatever was recorded.
    fn abort(&mut self);

    /// Whether a recording is currently live.
    fn is_recording(&self) -> bool;
}

// ---------------------------------------------------------------------------
// RecordingController
// ---------------------------------------------------------------------------

struct ActiveRecording {
    stop_tx: mpsc::Sender<()>,
    clip_rx: mpsc::Receiver<Result<AudioClip, CaptureError>>,
    thread: thread::JoinHandle<()>,
}

/// Production [`CaptureDevice`] backed by cpal.
pub struct RecordingController {
    /// Sample rate of finalized clips (Hz).
    target_rate: u32,
    /// Clip length cap in seconds.
    max_clip_secs: f32,
    active: Option<ActiveRecording>,
}

impl RecordingController {
    /// Create an idle controller producing clips at `target_rate` Hz, capped
    /// at `max_clip_secs` seconds.
    pub fn new(target_rate: u32, max_clip_secs: f32) -> Self {
        Self {
            target_rate,
            max_clip_secs,
            active: None,
        }
    }
}

impl CaptureDevice for RecordingController {
    fn start(&mut self) -> Result<(), CaptureError> {
        if self.active.is_some() {
            log::debug!("start() ignored — a recording is already live");
            return Ok(());
        }

        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), CaptureError>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (clip_tx, clip_rx) = mpsc::channel::<Result<AudioClip, CaptureError>>();

        let target_rate = self.target_rate;
        let max_clip_secs = self.max_clip_secs;

        let thread = thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || capture_worker(target_rate, max_clip_secs, ready_tx, stop_rx, clip_tx))
            .map_err(|e| {
                log::error!("failed to spawn audio-capture thread: {e}");
                CaptureError::WorkerStopped
            })?;

        // Synchronous acquisition handshake: wait until the worker has the
        // stream playing, or report why it could not.
        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.active = Some(ActiveRecording {
                    stop_tx,
                    clip_rx,
                    thread,
                });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(CaptureError::WorkerStopped)
            }
        }
    }

    fn stop(&mut self) -> Result<AudioClip, CaptureError> {
        let Some(active) = self.active.take() else {
            log::debug!("stop() with no live recording");
            return Err(CaptureError::EmptyClip);
        };

        // Worker also exits when the sender is gone, so a failed send just
        // means it is already on its way out.
        let _ = active.stop_tx.send(());

        let result = match active.clip_rx.recv_timeout(STOP_TIMEOUT) {
            Ok(result) => result,
            Err(_) => Err(CaptureError::WorkerStopped),
        };
        let _ = active.thread.join();
        result
    }

    fn abort(&mut self) {
        if let Some(active) = self.active.take() {
            log::debug!("aborting live recording");
            let _ = active.stop_tx.send(());
            let _ = active.thread.join();
        }
    }

    fn is_recording(&self) -> bool {
        self.active.is_some()
    }
}

impl Drop for RecordingController {
    fn drop(&mut self) {
        self.abort();
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Body of the `audio-capture` thread: owns the cpal stream from acquisition
/// to release and accumulates the clip.
fn capture_worker(
    target_rate: u32,
    max_clip_secs: f32,
    ready_tx: mpsc::Sender<Result<(), CaptureError>>,
    stop_rx: mpsc::Receiver<()>,
    clip_tx: mpsc::Sender<Result<AudioClip, CaptureError>>,
) {
    let capture = match AudioCapture::open() {
        Ok(capture) => capture,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let (chunk_tx, chunk_rx) = mpsc::channel();
    let stream = match capture.start(chunk_tx) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };
    let _ = ready_tx.send(Ok(()));
    log::info!(
        "recording started ({} Hz, {} ch)",
        capture.sample_rate(),
        capture.channels()
    );

    let mut buffer = ClipBuffer::new(target_rate, max_clip_secs);

    loop {
        match stop_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        match chunk_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(chunk) => {
                let mono = downmix_to_mono(&chunk.samples, chunk.channels);
                buffer.push(&resample(&mono, chunk.sample_rate, target_rate));
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // Release the device before finalizing so the hardware indicator goes
    // off the moment the user stops, not after encoding.
    drop(stream);

    // Pick up whatever the callback delivered between the stop signal and
    // the stream teardown.
    while let Ok(chunk) = chunk_rx.try_recv() {
        let mono = downmix_to_mono(&chunk.samples, chunk.channels);
        buffer.push(&resample(&mono, chunk.sample_rate, target_rate));
    }

    log::info!("recording stopped ({:.1}s captured)", buffer.duration_secs());
    let _ = clip_tx.send(buffer.finalize());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // `RecordingController` must be `Send` so the orchestrator task can own it.
    #[test]
    fn controller_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<RecordingController>();
    }

    #[test]
    fn stop_without_start_is_an_error() {
        let mut controller = RecordingController::new(16_000, 120.0);
        assert!(!controller.is_recording());
        assert!(controller.stop().is_err());
    }

    #[test]
    fn abort_without_start_is_a_noop() {
        let mut controller = RecordingController::new(16_000, 120.0);
        controller.abort();
        assert!(!controller.is_recording());
    }

    // Starting against real hardware is not exercised here — CI has no audio
    // device, and the orchestrator tests cover the lifecycle through the
    // CaptureDevice trait with a scripted double.
}
