//! Core transcription trait and error type.
//!
//! [`Transcriber`] is the interface a voice session uses to turn a recorded
//! [`AudioClip`] into text.  It is object-safe and `Send + Sync` so the
//! wizard can hold it behind an `Arc<dyn Transcriber>` and move clones into
//! spawned tasks.
//!
//! [`MockTranscriber`] (available under `#[cfg(test)]`) returns a
//! pre-configured response, optionally never completing, so sessions can be
//! tested without a network.

use async_trait::async_trait;
use thiserror::Error;

use crate::audio::{AudioClip, AudioError};

// ---------------------------------------------------------------------------
// TranscriptionError
// ---------------------------------------------------------------------------

/// Why a voice capture ended in the `failed` state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranscriptionError {
    /// The capture device could not be started or stopped.
    #[error("audio device error: {0}")]
    Device(#[from] AudioError),

    /// The recording was shorter than the configured minimum.
    #[error("recording too short ({secs:.1} s, minimum {min_secs:.1} s)")]
    AudioTooShort { secs: f32, min_secs: f32 },

    /// HTTP transport or connection error.
    #[error("transcription request failed: {0}")]
    Request(String),

    /// The service did not answer within the configured timeout.
    #[error("transcription request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("transcription service returned {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The response body was not the expected `{ "text": .. }` shape.
    #[error("failed to parse transcription response: {0}")]
    Parse(String),

    /// The service returned no usable text.
    #[error("transcription was empty")]
    EmptyTranscript,

    /// The background transcription task ended without reporting a result.
    #[error("transcription task was interrupted")]
    Interrupted,
}

impl From<reqwest::Error> for TranscriptionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranscriptionError::Timeout
        } else {
            TranscriptionError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Transcriber trait
// ---------------------------------------------------------------------------

/// Speech-to-text collaborator.
///
/// # Contract
///
/// - Returns the transcript for `clip`, or an error.  Any error means the
///   session fails with no partial result.
/// - Retries are not performed by the caller; an implementation may not
///   assume it will be called again for the same clip.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, clip: AudioClip) -> Result<String, TranscriptionError>;
}

// Compile-time assertion: Box<dyn Transcriber> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Transcriber>) {}
};

// ---------------------------------------------------------------------------
// MockTranscriber  (test-only)
// ---------------------------------------------------------------------------

/// A test double with a fixed response.
#[cfg(test)]
pub struct MockTranscriber {
    response: Option<Result<String, TranscriptionError>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockTranscriber {
    /// Always returns `Ok(text)`.
    pub fn ok(text: impl Into<String>) -> Self {
        Self::with(Some(Ok(text.into())))
    }

    /// Always returns `Err(error)`.
    pub fn err(error: TranscriptionError) -> Self {
        Self::with(Some(Err(error)))
    }

    /// Never completes; models a slow service call still in flight.
    pub fn hanging() -> Self {
        Self::with(None)
    }

    fn with(response: Option<Result<String, TranscriptionError>>) -> Self {
        Self {
            response,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// How many times `transcribe` was invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, _clip: AudioClip) -> Result<String, TranscriptionError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &self.response {
            Some(response) => response.clone(),
            None => std::future::pending().await,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
