//! Audio capture for voice answers.
//!
//! # Pipeline
//!
//! ```text
//! DeviceLock::try_acquire ─▶ AudioInput::start ─▶ (cpal callback → RecordingBuffer)
//!                            AudioInput::stop  ─▶ AudioClip ─▶ to_16k_mono ─▶ Transcriber
//! ```
//!
//! The live [`Microphone`] is only compiled with the `microphone` feature;
//! without it the wizard runs with [`UnavailableInput`].

pub mod buffer;
#[cfg(feature = "microphone")]
pub mod capture;
pub mod input;
pub mod lock;
pub mod resample;

pub use buffer::RecordingBuffer;
#[cfg(feature = "microphone")]
pub use capture::Microphone;
#[cfg(test)]
pub use input::FakeAudioInput;
pub use input::{AudioClip, AudioError, AudioInput, UnavailableInput};
pub use lock::{DeviceGuard, DeviceLock};
pub use resample::{resample_to_16k, stereo_to_mono};
