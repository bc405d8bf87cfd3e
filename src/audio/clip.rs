//! Clip accumulation and WAV encoding.
//!
//! While a recording is live the capture thread pushes 16 kHz mono samples
//! into a [`ClipBuffer`]; on stop the buffer is finalized into exactly one
//! [`AudioClip`] — a WAV payload carrying its media type, ready for the
//! transcription service.

use std::io::Cursor;

use super::capture::CaptureError;

/// Media type attached to every finalized clip.
pub const CLIP_MEDIA_TYPE: &str = "audio/wav";

// ---------------------------------------------------------------------------
// AudioClip
// ---------------------------------------------------------------------------

/// One finalized, encoded recording.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Complete WAV file bytes (16-bit PCM, mono).
    pub bytes: Vec<u8>,
    /// Media type of `bytes` — always [`CLIP_MEDIA_TYPE`].
    pub media_type: &'static str,
    /// Clip length in seconds.
    pub duration_secs: f32,
}

// ---------------------------------------------------------------------------
// ClipBuffer
// ---------------------------------------------------------------------------

/// Accumulates mono `f32` samples for the duration of one recording.
///
/// The buffer is bounded: samples past `max_samples` are dropped so a
/// recording left running cannot grow without bound. Unlike a ring buffer
/// the *head* of the recording is kept — for a spoken description the
/// opening sentences matter more than the tail.
pub struct ClipBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    max_samples: usize,
    truncated: bool,
}

impl ClipBuffer {
    /// Create an empty buffer for a recording at `sample_rate` Hz, capped at
    /// `max_secs` seconds.
    pub fn new(sample_rate: u32, max_secs: f32) -> Self {
        let max_samples = (sample_rate as f32 * max_secs.max(0.0)) as usize;
        Self {
            samples: Vec::new(),
            sample_rate,
            max_samples,
            truncated: false,
        }
    }

    /// Append a chunk of mono samples, dropping anything past the cap.
    pub fn push(&mut self, chunk: &[f32]) {
        let remaining = self.max_samples.saturating_sub(self.samples.len());
        if remaining == 0 {
            if !self.truncated {
                log::warn!(
                    "clip buffer full ({} samples) — dropping further audio",
                    self.max_samples
                );
                self.truncated = true;
            }
            return;
        }
        let take = remaining.min(chunk.len());
        self.samples.extend_from_slice(&chunk[..take]);
    }

    /// Number of samples accumulated so far.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` when no samples have been captured yet.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Current duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Encode the accumulated samples into one WAV [`AudioClip`], consuming
    /// the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::EmptyClip`] when nothing was captured.
    pub fn finalize(self) -> Result<AudioClip, CaptureError> {
        if self.samples.is_empty() {
            return Err(CaptureError::EmptyClip);
        }

        let duration_secs = self.duration_secs();

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            // Writing to an in-memory cursor cannot fail for I/O reasons;
            // hound only errors on spec violations, which the fixed spec
            // above rules out.
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .expect("WAV header for a fixed valid spec");
            for &sample in &self.samples {
                let s = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                writer.write_sample(s).expect("in-memory WAV write");
            }
            writer.finalize().expect("in-memory WAV finalize");
        }

        Ok(AudioClip {
            bytes: cursor.into_inner(),
            media_type: CLIP_MEDIA_TYPE,
            duration_secs,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_finalize_is_an_error() {
        let buf = ClipBuffer::new(16_000, 120.0);
        assert!(matches!(buf.finalize(), Err(CaptureError::EmptyClip)));
    }

    #[test]
    fn finalize_produces_wav_bytes() {
        let mut buf = ClipBuffer::new(16_000, 120.0);
        buf.push(&vec![0.25_f32; 16_000]); // 1 s
        let clip = buf.finalize().expect("finalize");

        assert_eq!(clip.media_type, "audio/wav");
        assert!((clip.duration_secs - 1.0).abs() < 1e-3);
        // RIFF/WAVE header + 16 000 × 2 bytes of payload
        assert_eq!(&clip.bytes[..4], b"RIFF");
        assert_eq!(&clip.bytes[8..12], b"WAVE");
        // fmt chunk: sample rate lives at offset 24 in a canonical header
        let rate = u32::from_le_bytes(clip.bytes[24..28].try_into().unwrap());
        assert_eq!(rate, 16_000);
        assert!(clip.bytes.len() > 32_000);
    }

    #[test]
    fn push_accumulates_across_chunks() {
        let mut buf = ClipBuffer::new(16_000, 120.0);
        buf.push(&[0.1_f32; 100]);
        buf.push(&[0.2_f32; 50]);
        assert_eq!(buf.len(), 150);
        assert!(!buf.is_empty());
    }

    #[test]
    fn buffer_is_capped_at_max_secs() {
        // 1 second cap at 16 kHz = 16 000 samples
        let mut buf = ClipBuffer::new(16_000, 1.0);
        buf.push(&vec![0.0_f32; 20_000]);
        assert_eq!(buf.len(), 16_000);

        // Further pushes are dropped entirely
        buf.push(&[0.5_f32; 100]);
        assert_eq!(buf.len(), 16_000);
    }

    #[test]
    fn duration_tracks_sample_count() {
        let mut buf = ClipBuffer::new(16_000, 120.0);
        buf.push(&vec![0.0_f32; 8_000]);
        assert!((buf.duration_secs() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn samples_are_clamped_into_i16_range() {
        let mut buf = ClipBuffer::new(16_000, 120.0);
        buf.push(&[2.0_f32, -2.0]); // out-of-range input must not wrap
        buf.push(&vec![0.0_f32; 100]);
        let clip = buf.finalize().expect("finalize");
        assert!(!clip.bytes.is_empty());
    }
}
