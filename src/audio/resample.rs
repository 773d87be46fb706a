//! Channel downmix and sample-rate conversion for captured clips.
//!
//! The transcription edge function takes 16 kHz mono PCM, while microphones
//! usually deliver 44.1/48 kHz stereo.  [`stereo_to_mono`] averages the
//! interleaved channels and [`resample_to_16k`] converts the rate with
//! linear interpolation, which is plenty for speech.

/// Average interleaved `channels` into one channel.
///
/// Mono input is copied through; zero channels yields an empty vector.
///
/// ```rust
/// use voice_intake::audio::stereo_to_mono;
///
/// let mono = stereo_to_mono(&[0.5, -0.5, 0.2, 0.4], 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn stereo_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
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

/// Convert mono `samples` at `source_rate` Hz to 16 kHz.
///
/// Returns the input unchanged when it is already 16 kHz, and an empty
/// vector for empty input or an unknown (zero) source rate.
pub fn resample_to_16k(samples: &[f32], source_rate: u32) -> Vec<f32> {
    const TARGET_RATE: u32 = 16_000;

    if source_rate == TARGET_RATE {
        return samples.to_vec();
    }
    if samples.is_empty() || source_rate == 0 {
        return Vec::new();
    }

    let step = source_rate as f64 / TARGET_RATE as f64;
    let output_len = (samples.len() as f64 / step).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            match (samples.get(idx), samples.get(idx + 1)) {
                (Some(a), Some(b)) => a * (1.0 - frac) + b * frac,
                (Some(a), None) => *a,
                _ => 0.0,
            }
        })
        .collect()
}
