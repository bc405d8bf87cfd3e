//! Audio resampling and channel mixing utilities.
//!
//! The transcription service expects a **16 kHz mono** WAV clip. This module
//! provides the two conversion steps applied to every chunk on its way into
//! the clip buffer:
//!
//! 1. [`downmix_to_mono`] — average any number of interleaved channels.
//! 2. [`resample`] — convert from the device's native rate to the target.
//!
//! The resampler uses linear interpolation (fast, zero extra deps), which is
//! plenty for speech headed to a transcription endpoint. For higher fidelity
//! replace the inner loop with the `rubato` crate (`SincFixedIn` +
//! `BlackmanHarris2` window) — rubato is already listed in `Cargo.toml` for
//! that upgrade path.

// ---------------------------------------------------------------------------
// downmix_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging all channels.
///
/// The output length is `samples.len() / channels`.
///
/// * If `channels == 1` the input slice is returned as an owned `Vec` with no
///   averaging (fast path).
/// * If `channels == 0` an empty vector is returned.
///
/// # Example
///
/// ```rust
/// use describelo::audio::downmix_to_mono;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, -0.2]; // L R L R
/// let mono = downmix_to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[0] - 0.0).abs() < 1e-6);
/// assert!((mono[1] - 0.0).abs() < 1e-6);
/// ```
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Resample mono `samples` from `source_rate` Hz to `target_rate` Hz using
/// linear interpolation.
///
/// * If `source_rate == target_rate` the input is cloned and returned
///   unchanged (no-op fast path).
/// * If `samples` is empty, or either rate is zero, an empty vector is
///   returned.
///
/// The output length is approximately
/// `samples.len() * target_rate / source_rate`.
///
/// # Example
///
/// ```rust
/// use describelo::audio::resample;
///
/// // Downsample from 48 kHz to 16 kHz (ratio = 1/3)
/// let hi = vec![0.5_f32; 480];
/// let lo = resample(&hi, 48_000, 16_000);
/// assert_eq!(lo.len(), 160);
/// ```
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate {
        return samples.to_vec();
    }

    if samples.is_empty() || source_rate == 0 || target_rate == 0 {
        return Vec::new();
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos as usize;
        let frac = src_pos - idx as f64;

        let sample = if idx + 1 < samples.len() {
            // Linear interpolation between adjacent samples
            samples[idx] * (1.0 - frac as f32) + samples[idx + 1] * frac as f32
        } else if idx < samples.len() {
            samples[idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
