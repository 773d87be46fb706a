//! Voice capture sessions.
//!
//! A [`VoiceCaptureSession`] drives one recording from the microphone to
//! a transcript for a single field.  The wizard controller owns at most one
//! session at a time and the shared [`DeviceLock`](crate::audio::DeviceLock)
//! extends that limit to every controller using the same device.

pub mod session;

pub use session::{VoiceCaptureSession, VoiceError, VoiceState};
