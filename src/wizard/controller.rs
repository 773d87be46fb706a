//! `WizardController` — owns the step cursor, the answers and the single
//! voice slot, and enforces the navigation and concurrency rules.
//!
//! # Concurrency rules
//!
//! | Busy with          | `go_next` / `go_back` | `start_voice`                | `set_value` |
//! |--------------------|-----------------------|------------------------------|-------------|
//! | nothing            | allowed (if valid)    | allowed                      | allowed     |
//! | voice capture      | `Blocked(Busy)`       | `ConcurrentOperationRejected`| allowed     |
//! | submission         | `Blocked(Busy)`       | `ConcurrentOperationRejected`| allowed     |
//!
//! Typed edits are always accepted.  A transcript is written when the
//! capture finishes, so it overwrites whatever was typed into the same
//! field while the service call was in flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::audio::{AudioInput, DeviceLock};
use crate::config::{AppConfig, VoiceConfig};
use crate::intake::{Confirmation, SubmissionAssembler, SubmissionError};
use crate::store::RecordStore;
use crate::stt::{Transcriber, TranscriptionError};
use crate::voice::{VoiceCaptureSession, VoiceError, VoiceState};
use crate::wizard::answers::AnswerMap;
use crate::wizard::step::{build_steps, StepConfigError, WizardStep};
use crate::wizard::validator;

// ---------------------------------------------------------------------------
// Outcomes and errors
// ---------------------------------------------------------------------------

/// Long-running work that makes the wizard refuse conflicting requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    VoiceCapture,
    Submission,
    /// Another controller sharing the same device lock is recording.
    DeviceInUse,
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Activity::VoiceCapture => "a voice capture is in progress",
            Activity::Submission => "a submission is in flight",
            Activity::DeviceInUse => "the microphone is in use",
        })
    }
}

/// Why a navigation request left the wizard where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// The current required step has unanswered fields.
    Validation,
    Busy(Activity),
    AtFirstStep,
    /// `submit` outside the last step.
    NotLastStep,
    /// Already submitted; `reset` starts a new intake.
    Completed,
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockReason::Validation => f.write_str("required fields are missing"),
            BlockReason::Busy(activity) => write!(f, "{activity}"),
            BlockReason::AtFirstStep => f.write_str("already at the first step"),
            BlockReason::NotLastStep => f.write_str("not at the last step"),
            BlockReason::Completed => f.write_str("the intake was already submitted"),
        }
    }
}

/// Result of `go_next`, `go_back` and `submit`.
#[derive(Debug, Clone, PartialEq)]
pub enum Navigation {
    Moved { from: usize, to: usize },
    Submitted(Confirmation),
    /// Nothing changed.
    Blocked(BlockReason),
}

/// A transcript that was written into the answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceOutcome {
    pub field: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WizardError {
    #[error("request rejected: {0}")]
    ConcurrentOperationRejected(Activity),

    #[error("no voice capture in progress")]
    NoVoiceSession,

    #[error("voice capture is {actual}, expected {expected}")]
    InvalidVoiceState {
        expected: VoiceState,
        actual: VoiceState,
    },

    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Config(#[from] StepConfigError),

    #[error("required field {0:?} has no destination attribute")]
    UnmappedField(String),

    #[error("voice.{setting} = {value} must be between 0 and 86400 seconds")]
    InvalidRecordingLimit { setting: &'static str, value: f32 },
}

impl From<VoiceError> for WizardError {
    fn from(e: VoiceError) -> Self {
        match e {
            VoiceError::WrongState { expected, actual } => {
                WizardError::InvalidVoiceState { expected, actual }
            }
            VoiceError::Transcription(e) => WizardError::Transcription(e),
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceLimits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceLimits {
    pub min_recording_secs: f32,
    pub max_recording: Duration,
}

/// Upper bound for either recording limit (one day).
pub const MAX_RECORDING_SECS: f32 = 86_400.0;

impl VoiceLimits {
    /// Rejects limits that are negative, not finite, or longer than
    /// [`MAX_RECORDING_SECS`].
    pub fn from_config(config: &VoiceConfig) -> Result<Self, WizardError> {
        let min_recording_secs = checked_secs("min_recording_secs", config.min_recording_secs)?;
        let max_secs = checked_secs("max_recording_secs", config.max_recording_secs)?;
        let max_recording = Duration::try_from_secs_f32(max_secs).map_err(|_| {
            WizardError::InvalidRecordingLimit {
                setting: "max_recording_secs",
                value: config.max_recording_secs,
            }
        })?;
        Ok(Self {
            min_recording_secs,
            max_recording,
        })
    }
}

fn checked_secs(setting: &'static str, value: f32) -> Result<f32, WizardError> {
    if (0.0..=MAX_RECORDING_SECS).contains(&value) {
        Ok(value)
    } else {
        Err(WizardError::InvalidRecordingLimit { setting, value })
    }
}

impl Default for VoiceLimits {
    fn default() -> Self {
        Self {
            min_recording_secs: 0.5,
            max_recording: Duration::from_secs(60),
        }
    }
}

// ---------------------------------------------------------------------------
// WizardController
// ---------------------------------------------------------------------------

pub struct WizardController {
    steps: Vec<WizardStep>,
    current: usize,
    answers: AnswerMap,
    voice: Option<VoiceCaptureSession>,
    next_session_id: u64,
    is_submitting: bool,
    confirmation: Option<Confirmation>,
    last_error: Option<String>,
    limits: VoiceLimits,
    device: DeviceLock,
    audio: Box<dyn AudioInput>,
    transcriber: Arc<dyn Transcriber>,
    store: Arc<dyn RecordStore>,
    assembler: SubmissionAssembler,
}

impl WizardController {
    /// Build a wizard positioned on the first step with no answers.
    ///
    /// Every field of a required step must have a destination attribute in
    /// `assembler`, otherwise a completed intake could silently lose data.
    pub fn new(
        steps: Vec<WizardStep>,
        assembler: SubmissionAssembler,
        audio: Box<dyn AudioInput>,
        transcriber: Arc<dyn Transcriber>,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self, WizardError> {
        if steps.is_empty() {
            return Err(StepConfigError::NoSteps.into());
        }
        for step in steps.iter().filter(|s| s.is_required()) {
            if let Some(key) = step.field_keys().iter().find(|k| !assembler.maps(k)) {
                return Err(WizardError::UnmappedField(key.clone()));
            }
        }

        Ok(Self {
            steps,
            current: 0,
            answers: AnswerMap::new(),
            voice: None,
            next_session_id: 0,
            is_submitting: false,
            confirmation: None,
            last_error: None,
            limits: VoiceLimits::default(),
            device: DeviceLock::new(),
            audio,
            transcriber,
            store,
            assembler,
        })
    }

    /// Build steps, assembler and voice limits from `config`.
    pub fn from_config(
        config: &AppConfig,
        audio: Box<dyn AudioInput>,
        transcriber: Arc<dyn Transcriber>,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self, WizardError> {
        let steps = build_steps(&config.wizard.steps)?;
        let assembler = SubmissionAssembler::from_config(&config.intake);
        let limits = VoiceLimits::from_config(&config.voice)?;
        Ok(Self::new(steps, assembler, audio, transcriber, store)?.with_voice_limits(limits))
    }

    /// Share one microphone slot with other controllers.
    pub fn with_device_lock(mut self, device: DeviceLock) -> Self {
        self.device = device;
        self
    }

    pub fn with_voice_limits(mut self, limits: VoiceLimits) -> Self {
        self.limits = limits;
        self
    }

    // ── Read-only view ──────────────────────────────────────────────────

    pub fn steps(&self) -> &[WizardStep] {
        &self.steps
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> &WizardStep {
        &self.steps[self.current]
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn is_last_step(&self) -> bool {
        self.current + 1 == self.steps.len()
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.answers.get_value(key)
    }

    /// Gate for the current step.  Enables the Next/Submit button.
    pub fn can_advance(&self) -> bool {
        validator::can_advance(self.current_step(), &self.answers)
    }

    pub fn missing_fields(&self) -> Vec<&str> {
        validator::missing_fields(self.current_step(), &self.answers)
    }

    /// `true` when `go_next` would submit rather than move.
    pub fn next_submits(&self) -> bool {
        self.navigation_block().is_none() && self.is_last_step() && self.can_advance()
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    pub fn voice_state(&self) -> VoiceState {
        self.voice.as_ref().map_or(VoiceState::Idle, |s| s.state())
    }

    /// Field bound to the active voice capture, if any.
    pub fn voice_field(&self) -> Option<&str> {
        self.voice.as_ref().map(|s| s.field_key())
    }

    pub fn voice_elapsed(&self) -> Option<Duration> {
        self.voice
            .as_ref()
            .filter(|s| s.state() == VoiceState::Recording)
            .map(|s| s.elapsed())
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }

    /// Human-readable message for the most recent failed capture or submit.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn busy(&self) -> Option<Activity> {
        if self.is_submitting {
            Some(Activity::Submission)
        } else if self.voice_state().is_busy() {
            Some(Activity::VoiceCapture)
        } else {
            None
        }
    }

    fn navigation_block(&self) -> Option<BlockReason> {
        if let Some(activity) = self.busy() {
            return Some(BlockReason::Busy(activity));
        }
        self.confirmation.as_ref().map(|_| BlockReason::Completed)
    }

    // ── Answers ─────────────────────────────────────────────────────────

    /// Typed input.  Always accepted, even mid-capture.
    pub fn set_value(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        log::debug!("wizard: {key} set ({} chars)", value.chars().count());
        self.answers.set_value(key, value);
    }

    // ── Navigation ──────────────────────────────────────────────────────

    /// Move forward, or submit from the last step.
    pub async fn go_next(&mut self) -> Result<Navigation, WizardError> {
        if let Some(reason) = self.navigation_block() {
            return Ok(Navigation::Blocked(reason));
        }
        if !self.can_advance() {
            log::debug!("wizard: step {} blocked by validation", self.current);
            return Ok(Navigation::Blocked(BlockReason::Validation));
        }
        if self.is_last_step() {
            return self.submit().await;
        }

        let from = self.current;
        self.current += 1;
        log::debug!("wizard: step {from} → {}", self.current);
        Ok(Navigation::Moved {
            from,
            to: self.current,
        })
    }

    /// Move back one step.  Answers are kept; no validation applies.
    pub fn go_back(&mut self) -> Navigation {
        if let Some(reason) = self.navigation_block() {
            return Navigation::Blocked(reason);
        }
        if self.current == 0 {
            return Navigation::Blocked(BlockReason::AtFirstStep);
        }

        let from = self.current;
        self.current -= 1;
        log::debug!("wizard: step {from} → {}", self.current);
        Navigation::Moved {
            from,
            to: self.current,
        }
    }

    /// Send the answers to the store.  Only valid on the last step.
    ///
    /// On success the answers are cleared and the confirmation kept until
    /// [`reset`](Self::reset).  On failure the answers are untouched so the
    /// user can try again.
    pub async fn submit(&mut self) -> Result<Navigation, WizardError> {
        if let Some(reason) = self.navigation_block() {
            return Ok(Navigation::Blocked(reason));
        }
        if !self.is_last_step() {
            return Ok(Navigation::Blocked(BlockReason::NotLastStep));
        }
        if !self.can_advance() {
            return Ok(Navigation::Blocked(BlockReason::Validation));
        }

        self.is_submitting = true;
        self.last_error = None;
        let result = self
            .assembler
            .submit(&self.answers, self.store.as_ref())
            .await;
        self.is_submitting = false;

        match result {
            Ok(confirmation) => {
                log::info!(
                    "wizard: intake {} submitted (priority {})",
                    confirmation.id,
                    confirmation.priority
                );
                self.answers.clear();
                self.confirmation = Some(confirmation.clone());
                Ok(Navigation::Submitted(confirmation))
            }
            Err(e) => {
                log::warn!("wizard: submission failed: {e}");
                self.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Back to the first step with no answers, dropping any capture.
    pub fn reset(&mut self) {
        self.cancel_voice();
        self.answers.clear();
        self.current = 0;
        self.confirmation = None;
        self.last_error = None;
        log::debug!("wizard: reset");
    }

    // ── Voice ───────────────────────────────────────────────────────────

    /// Start recording for `field`.
    ///
    /// Rejected while any capture or submission is in progress, or while
    /// another controller holds the shared device.
    pub fn start_voice(&mut self, field: &str) -> Result<(), WizardError> {
        if let Some(activity) = self.busy() {
            log::warn!("wizard: voice for {field} rejected: {activity}");
            return Err(WizardError::ConcurrentOperationRejected(activity));
        }
        let guard = self.device.try_acquire().ok_or_else(|| {
            log::warn!("wizard: voice for {field} rejected: device in use");
            WizardError::ConcurrentOperationRejected(Activity::DeviceInUse)
        })?;

        self.next_session_id += 1;
        let session =
            VoiceCaptureSession::start(self.next_session_id, field, guard, self.audio.as_mut())?;
        log::debug!("wizard: voice[{}] recording {field}", session.id());
        self.voice = Some(session);
        Ok(())
    }

    /// Stop recording and hand the audio to the transcriber.  Collect the
    /// result with [`finish_voice`](Self::finish_voice).
    pub fn stop_voice(&mut self) -> Result<(), WizardError> {
        let session = self.voice.as_mut().ok_or(WizardError::NoVoiceSession)?;
        let transcriber = Arc::clone(&self.transcriber);

        match session.stop(
            self.audio.as_mut(),
            transcriber,
            self.limits.min_recording_secs,
        ) {
            Ok(()) => Ok(()),
            Err(e) => {
                if session.state().is_terminal() {
                    self.last_error = Some(e.to_string());
                    self.voice = None;
                }
                Err(e.into())
            }
        }
    }

    /// Wait for the in-flight transcription and apply it.
    ///
    /// On success the transcript replaces the bound field's value.  On
    /// failure the answers are unchanged.  Either way the session ends and
    /// the device is free again.  Cancel-safe: dropping the future leaves
    /// the capture transcribing.
    pub async fn finish_voice(&mut self) -> Result<VoiceOutcome, WizardError> {
        let session = self.voice.as_mut().ok_or(WizardError::NoVoiceSession)?;

        let result = match session.wait().await {
            Ok(text) => Ok(text),
            Err(VoiceError::Transcription(e)) => Err(e),
            Err(VoiceError::WrongState { expected, actual }) => {
                return Err(WizardError::InvalidVoiceState { expected, actual })
            }
        };
        let field = session.field_key().to_string();
        self.voice = None;

        match result {
            Ok(text) => {
                log::debug!(
                    "wizard: {field} filled by voice ({} chars)",
                    text.chars().count()
                );
                self.answers.set_value(field.clone(), text.clone());
                self.last_error = None;
                Ok(VoiceOutcome { field, text })
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Abandon the active capture without touching the answers.  Returns
    /// `false` when there was nothing to cancel.
    pub fn cancel_voice(&mut self) -> bool {
        match self.voice.take() {
            Some(mut session) => {
                session.cancel(self.audio.as_mut());
                true
            }
            None => false,
        }
    }

    /// When the current recording hits its length cap.
    pub fn recording_deadline(&self) -> Option<Instant> {
        self.voice
            .as_ref()
            .and_then(|s| s.recording_deadline(self.limits.max_recording))
    }

    /// Stop the recording if it has reached the cap.  Returns `true` when
    /// it did.
    pub fn enforce_recording_cap(&mut self) -> Result<bool, WizardError> {
        self.enforce_recording_cap_at(Instant::now())
    }

    pub fn enforce_recording_cap_at(&mut self, now: Instant) -> Result<bool, WizardError> {
        match self.recording_deadline() {
            Some(deadline) if now >= deadline => {
                log::info!(
                    "wizard: recording reached {:.0} s cap, stopping",
                    self.limits.max_recording.as_secs_f32()
                );
                self.stop_voice()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
