//! One recording attempt bound to one answer slot.
//!
//! ```text
//! Idle ──start──▶ Recording ──stop / cap──▶ Transcribing ──text──▶ Succeeded
//!                     │                          │        ──error─▶ Failed
//!                     └──────────cancel──────────┴──────────────▶ Idle
//! ```
//!
//! The session holds the [`DeviceGuard`] from `start` until it reaches
//! `Succeeded`, `Failed` or is cancelled.  It never touches the answer map:
//! the controller writes the transcript on `Succeeded`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::audio::{AudioClip, AudioInput, DeviceGuard};
use crate::stt::{Transcriber, TranscriptionError};

// ---------------------------------------------------------------------------
// VoiceState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VoiceState {
    /// No capture in progress.
    #[default]
    Idle,
    /// The microphone is open.
    Recording,
    /// Audio handed to the transcription service; waiting for text.
    Transcribing,
    /// Transcript received and written to the bound field.
    Succeeded,
    /// Capture or transcription failed; the bound field is untouched.
    Failed,
}

impl VoiceState {
    /// `true` while the session owns the device.  Navigation and new
    /// captures are refused while any session is busy.
    ///
    /// ```
    /// use voice_intake::voice::VoiceState;
    ///
    /// assert!(!VoiceState::Idle.is_busy());
    /// assert!(VoiceState::Recording.is_busy());
    /// assert!(VoiceState::Transcribing.is_busy());
    /// assert!(!VoiceState::Succeeded.is_busy());
    /// assert!(!VoiceState::Failed.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(self, VoiceState::Recording | VoiceState::Transcribing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VoiceState::Succeeded | VoiceState::Failed)
    }

    /// Short label for status lines.
    pub fn label(&self) -> &'static str {
        match self {
            VoiceState::Idle => "idle",
            VoiceState::Recording => "recording",
            VoiceState::Transcribing => "transcribing",
            VoiceState::Succeeded => "succeeded",
            VoiceState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for VoiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// VoiceError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VoiceError {
    #[error("voice capture is {actual}, expected {expected}")]
    WrongState {
        expected: VoiceState,
        actual: VoiceState,
    },

    #[error(transparent)]
    Transcription(#[from] TranscriptionError),
}

// ---------------------------------------------------------------------------
// VoiceCaptureSession
// ---------------------------------------------------------------------------

struct PendingTranscription {
    result_rx: oneshot::Receiver<Result<String, TranscriptionError>>,
    task: JoinHandle<()>,
}

pub struct VoiceCaptureSession {
    id: u64,
    field_key: String,
    state: VoiceState,
    started_at: Instant,
    guard: Option<DeviceGuard>,
    pending: Option<PendingTranscription>,
}

impl std::fmt::Debug for VoiceCaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceCaptureSession")
            .field("id", &self.id)
            .field("field_key", &self.field_key)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl VoiceCaptureSession {
    /// `idle → recording`.  The caller has already won the device lock; if
    /// the device fails to open, the guard is dropped and no session exists.
    pub fn start(
        id: u64,
        field_key: impl Into<String>,
        guard: DeviceGuard,
        audio: &mut dyn AudioInput,
    ) -> Result<Self, VoiceError> {
        audio.start().map_err(TranscriptionError::from)?;

        Ok(Self {
            id,
            field_key: field_key.into(),
            state: VoiceState::Recording,
            started_at: Instant::now(),
            guard: Some(guard),
            pending: None,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn field_key(&self) -> &str {
        &self.field_key
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    /// Time since recording started, for the UI timer.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// When a recording capped at `max` must be stopped.  `None` unless
    /// currently recording.
    pub fn recording_deadline(&self, max: Duration) -> Option<Instant> {
        (self.state == VoiceState::Recording).then(|| self.started_at + max)
    }

    /// `recording → transcribing`.  Releases the microphone and spawns the
    /// transcription call; its result is collected by [`wait`](Self::wait).
    ///
    /// A device error while stopping moves the session straight to `Failed`.
    pub fn stop(
        &mut self,
        audio: &mut dyn AudioInput,
        transcriber: Arc<dyn Transcriber>,
        min_recording_secs: f32,
    ) -> Result<(), VoiceError> {
        if self.state != VoiceState::Recording {
            return Err(VoiceError::WrongState {
                expected: VoiceState::Recording,
                actual: self.state,
            });
        }

        let clip = match audio.stop() {
            Ok(clip) => clip,
            Err(e) => {
                self.finish(VoiceState::Failed);
                return Err(TranscriptionError::from(e).into());
            }
        };

        log::debug!(
            "voice[{}]: recorded {:.1} s for {:?}",
            self.id,
            clip.duration_secs(),
            self.field_key
        );

        let (result_tx, result_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let result = transcribe_clip(transcriber.as_ref(), clip, min_recording_secs).await;
            let _ = result_tx.send(result);
        });

        self.pending = Some(PendingTranscription { result_rx, task });
        self.state = VoiceState::Transcribing;
        Ok(())
    }

    /// `transcribing → succeeded | failed`.  Returns the trimmed transcript.
    ///
    /// Cancel-safe: dropping the future before it completes leaves the
    /// session transcribing.
    pub async fn wait(&mut self) -> Result<String, VoiceError> {
        let pending = match (self.state, self.pending.as_mut()) {
            (VoiceState::Transcribing, Some(pending)) => pending,
            _ => {
                return Err(VoiceError::WrongState {
                    expected: VoiceState::Transcribing,
                    actual: self.state,
                })
            }
        };

        let result = (&mut pending.result_rx)
            .await
            .unwrap_or(Err(TranscriptionError::Interrupted));

        match result {
            Ok(text) => {
                self.finish(VoiceState::Succeeded);
                Ok(text)
            }
            Err(e) => {
                log::warn!("voice[{}]: transcription failed: {e}", self.id);
                self.finish(VoiceState::Failed);
                Err(e.into())
            }
        }
    }

    /// Abort from any state back to `Idle`, releasing the device.
    pub fn cancel(&mut self, audio: &mut dyn AudioInput) {
        match self.state {
            VoiceState::Recording => audio.abort(),
            VoiceState::Transcribing => {
                if let Some(pending) = &self.pending {
                    pending.task.abort();
                }
            }
            _ => {}
        }
        log::debug!("voice[{}]: cancelled while {}", self.id, self.state);
        self.finish(VoiceState::Idle);
    }

    fn finish(&mut self, state: VoiceState) {
        self.pending = None;
        self.guard = None;
        self.state = state;
    }
}

impl Drop for VoiceCaptureSession {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
        }
    }
}

/// Body of the spawned transcription task.
async fn transcribe_clip(
    transcriber: &dyn Transcriber,
    clip: AudioClip,
    min_recording_secs: f32,
) -> Result<String, TranscriptionError> {
    let secs = clip.duration_secs();
    if secs < min_recording_secs {
        return Err(TranscriptionError::AudioTooShort {
            secs,
            min_secs: min_recording_secs,
        });
    }

    let text = transcriber.transcribe(clip).await?;
    let text = text.trim();
    if text.is_empty() {
        return Err(TranscriptionError::EmptyTranscript);
    }
    Ok(text.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
