//! Audio input seam used by voice capture sessions.
//!
//! [`AudioInput`] is the narrow contract the wizard needs from a capture
//! device: start, stop (returning everything captured), or abort.  The
//! production implementation is [`Microphone`](crate::audio::Microphone)
//! (behind the `microphone` feature); [`UnavailableInput`] stands in when no
//! device is compiled in so the wizard still runs with typed answers only.

use thiserror::Error;

use crate::audio::resample::{resample_to_16k, stereo_to_mono};

// ---------------------------------------------------------------------------
// AudioClip
// ---------------------------------------------------------------------------

/// Everything captured between `start` and `stop` of one recording.
///
/// Samples are interleaved `f32` in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioClip {
    /// A mono clip at `sample_rate` Hz.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            channels: 1,
        }
    }

    /// Length of the clip in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / (self.sample_rate as f32 * self.channels as f32)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Downmix to mono and resample to 16 kHz, the format the transcription
    /// service expects.
    pub fn to_16k_mono(&self) -> AudioClip {
        let mono = stereo_to_mono(&self.samples, self.channels);
        AudioClip::mono(resample_to_16k(&mono, self.sample_rate), 16_000)
    }
}

// ---------------------------------------------------------------------------
// AudioError
// ---------------------------------------------------------------------------

/// Errors raised by an [`AudioInput`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioError {
    #[error("no audio input device is available")]
    NoDevice,

    #[error("audio stream failed: {0}")]
    Stream(String),

    #[error("the input device is already recording")]
    AlreadyRecording,

    #[error("the input device is not recording")]
    NotRecording,
}

// ---------------------------------------------------------------------------
// AudioInput trait
// ---------------------------------------------------------------------------

/// A capture device owned by exactly one wizard controller.
///
/// Exclusivity across controllers is enforced by
/// [`DeviceLock`](crate::audio::DeviceLock), not by the implementation.
pub trait AudioInput: Send {
    /// Begin capturing.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop capturing, release the device and return the captured clip.
    fn stop(&mut self) -> Result<AudioClip, AudioError>;

    /// Stop capturing and discard whatever was recorded.  Never fails.
    fn abort(&mut self);
}

// Compile-time assertion: Box<dyn AudioInput> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AudioInput>) {}
};

// ---------------------------------------------------------------------------
// UnavailableInput
// ---------------------------------------------------------------------------

/// Input used when no capture device exists.  Every `start` fails with
/// [`AudioError::NoDevice`], so voice capture degrades to typing.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableInput;

impl AudioInput for UnavailableInput {
    fn start(&mut self) -> Result<(), AudioError> {
        Err(AudioError::NoDevice)
    }

    fn stop(&mut self) -> Result<AudioClip, AudioError> {
        Err(AudioError::NotRecording)
    }

    fn abort(&mut self) {}
}

// ---------------------------------------------------------------------------
// FakeAudioInput  (test-only)
// ---------------------------------------------------------------------------

/// Test double that "records" a pre-configured clip.
///
/// [`FakeAudioInput::probe`] returns a flag that is `true` while the fake
/// device is capturing, so tests can assert the device was released.
#[cfg(test)]
pub struct FakeAudioInput {
    clip: AudioClip,
    fail_start: bool,
    recording: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(test)]
impl FakeAudioInput {
    /// One second of 16 kHz silence.
    pub fn one_second() -> Self {
        Self::with_clip(AudioClip::mono(vec![0.0; 16_000], 16_000))
    }

    pub fn with_clip(clip: AudioClip) -> Self {
        Self {
            clip,
            fail_start: false,
            recording: Default::default(),
        }
    }

    /// A device whose `start` always fails.
    pub fn broken() -> Self {
        Self {
            fail_start: true,
            ..Self::one_second()
        }
    }

    pub fn probe(&self) -> std::sync::Arc<std::sync::atomic::AtomicBool> {
        std::sync::Arc::clone(&self.recording)
    }
}

#[cfg(test)]
impl AudioInput for FakeAudioInput {
    fn start(&mut self) -> Result<(), AudioError> {
        use std::sync::atomic::Ordering;
        if self.fail_start {
            return Err(AudioError::Stream("device unplugged".into()));
        }
        if self.recording.swap(true, Ordering::SeqCst) {
            return Err(AudioError::AlreadyRecording);
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<AudioClip, AudioError> {
        use std::sync::atomic::Ordering;
        if !self.recording.swap(false, Ordering::SeqCst) {
            return Err(AudioError::NotRecording);
        }
        Ok(self.clip.clone())
    }

    fn abort(&mut self) {
        self.recording
            .store(false, std::sync::atomic::Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
