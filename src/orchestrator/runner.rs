//! Orchestrator — drives one [`WizardController`] from a command channel.
//!
//! [`WizardOrchestrator`] owns the controller and responds to
//! [`WizardCommand`]s received over a `tokio::sync::mpsc` channel.
//!
//! # Event loop
//!
//! ```text
//! select! {
//!   command            ─▶ controller.{set_value, start_voice, go_next, …}
//!   finish_voice()     ─▶ VoiceFilled / VoiceFailed      (while transcribing)
//!   recording deadline ─▶ stop_voice → VoiceTranscribing  (while recording)
//! }
//! after each wake-up: publish WizardView, emit WizardEvents
//! ```
//!
//! Typed edits keep flowing while a transcription is in flight.  A
//! submission is awaited inline, so commands sent during it queue up and
//! run once the store answers.

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant as TokioInstant};

use crate::voice::VoiceState;
use crate::wizard::{BlockReason, Navigation, VoiceOutcome, WizardController, WizardError};

use super::command::{WizardCommand, WizardEvent};
use super::state::{SharedView, WizardView};

/// What woke the loop up.
enum Wake {
    Command(WizardCommand),
    Transcribed(Result<VoiceOutcome, WizardError>),
    RecordingCap,
}

pub struct WizardOrchestrator {
    controller: WizardController,
    view: SharedView,
    events: mpsc::UnboundedSender<WizardEvent>,
}

impl WizardOrchestrator {
    /// # Arguments
    ///
    /// * `view`   — snapshot refreshed after every change (also read by the UI).
    /// * `events` — user-facing notifications; a closed receiver is ignored.
    pub fn new(
        controller: WizardController,
        view: SharedView,
        events: mpsc::UnboundedSender<WizardEvent>,
    ) -> Self {
        Self {
            controller,
            view,
            events,
        }
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run until `commands` is closed, then hand the controller back.
    ///
    /// Any capture still running at shutdown is cancelled.
    pub async fn run(mut self, mut commands: mpsc::Receiver<WizardCommand>) -> WizardController {
        self.publish();

        loop {
            let transcribing = self.controller.voice_state() == VoiceState::Transcribing;
            let voice_field = self.voice_field();
            let deadline = self.controller.recording_deadline();
            let cap_at = TokioInstant::from_std(deadline.unwrap_or_else(std::time::Instant::now));

            let wake = tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => Wake::Command(command),
                    None => break,
                },
                result = self.controller.finish_voice(), if transcribing => Wake::Transcribed(result),
                _ = sleep_until(cap_at), if deadline.is_some() => Wake::RecordingCap,
            };

            match wake {
                Wake::Command(command) => self.handle_command(command).await,
                Wake::Transcribed(result) => self.handle_transcribed(voice_field, result),
                Wake::RecordingCap => self.handle_recording_cap(),
            }
            self.publish();
        }

        if self.controller.cancel_voice() {
            log::info!("orchestrator: command channel closed, capture cancelled");
        } else {
            log::info!("orchestrator: command channel closed, shutting down");
        }
        self.publish();
        self.controller
    }

    // -----------------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------------

    async fn handle_command(&mut self, command: WizardCommand) {
        match command {
            WizardCommand::SetValue { field, value } => {
                self.controller.set_value(&field, value);
                self.emit(WizardEvent::ValueSet { field });
            }
            WizardCommand::StartVoice { field } => match self.controller.start_voice(&field) {
                Ok(()) => self.emit(WizardEvent::VoiceStarted { field }),
                Err(e) => self.reject(e),
            },
            WizardCommand::StopVoice => {
                let field = self.voice_field();
                match self.controller.stop_voice() {
                    Ok(()) => self.emit(WizardEvent::VoiceTranscribing {
                        field,
                        capped: false,
                    }),
                    Err(e) => self.voice_error(field, e),
                }
            }
            WizardCommand::CancelVoice => {
                let field = self.voice_field();
                if self.controller.cancel_voice() {
                    self.emit(WizardEvent::VoiceCancelled { field });
                } else {
                    self.reject(WizardError::NoVoiceSession);
                }
            }
            WizardCommand::Next => {
                let result = self.controller.go_next().await;
                self.navigated(result);
            }
            WizardCommand::Back => {
                let nav = self.controller.go_back();
                self.navigated(Ok(nav));
            }
            WizardCommand::Submit => {
                let result = self.controller.submit().await;
                self.navigated(result);
            }
            WizardCommand::Reset => {
                self.controller.reset();
                self.emit(WizardEvent::Reset);
            }
        }
    }

    /// `field` is read before the wait, since the session is gone by now.
    fn handle_transcribed(&mut self, field: String, result: Result<VoiceOutcome, WizardError>) {
        match result {
            Ok(VoiceOutcome { field, text }) => self.emit(WizardEvent::VoiceFilled { field, text }),
            Err(e) => self.voice_error(field, e),
        }
    }

    fn handle_recording_cap(&mut self) {
        let field = self.voice_field();
        match self.controller.enforce_recording_cap() {
            Ok(true) => self.emit(WizardEvent::VoiceTranscribing {
                field,
                capped: true,
            }),
            Ok(false) => {}
            Err(e) => self.voice_error(field, e),
        }
    }

    fn navigated(&mut self, result: Result<Navigation, WizardError>) {
        match result {
            Ok(Navigation::Moved { from, to }) => self.emit(WizardEvent::StepChanged { from, to }),
            Ok(Navigation::Submitted(confirmation)) => self.emit(WizardEvent::Submitted {
                id: confirmation.id,
                priority: confirmation.priority,
            }),
            Ok(Navigation::Blocked(BlockReason::Validation)) => {
                let missing = self
                    .controller
                    .missing_fields()
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                self.emit(WizardEvent::ValidationBlocked { missing });
            }
            Ok(Navigation::Blocked(reason)) => self.emit(WizardEvent::Blocked(reason)),
            Err(WizardError::Submission(e)) => self.emit(WizardEvent::SubmissionFailed {
                error: e.to_string(),
            }),
            Err(e) => self.reject(e),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn voice_field(&self) -> String {
        self.controller.voice_field().unwrap_or_default().to_string()
    }

    fn voice_error(&mut self, field: String, error: WizardError) {
        match error {
            WizardError::Transcription(e) => self.emit(WizardEvent::VoiceFailed {
                field,
                error: e.to_string(),
            }),
            other => self.reject(other),
        }
    }

    fn reject(&mut self, error: WizardError) {
        log::debug!("orchestrator: rejected: {error}");
        self.emit(WizardEvent::Rejected {
            reason: error.to_string(),
        });
    }

    fn emit(&mut self, event: WizardEvent) {
        if self.events.send(event).is_err() {
            log::debug!("orchestrator: event receiver dropped");
        }
    }

    fn publish(&self) {
        let snapshot = WizardView::capture(&self.controller);
        let mut view = self
            .view
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *view = snapshot;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::FakeAudioInput;
    use crate::intake::{FieldMapping, Priority, PriorityRules, SubmissionAssembler};
    use crate::orchestrator::state::{new_shared_view, read_view};
    use crate::store::{MemoryStore, StoreError};
    use crate::stt::{MockTranscriber, TranscriptionError};
    use crate::wizard::{build_steps, Activity, StepConfig, VoiceLimits};
    use std::sync::Arc;
    use std::time::Duration;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn controller(transcriber: MockTranscriber, store: Arc<MemoryStore>) -> WizardController {
        let steps = build_steps(&[
            StepConfig::new("Name", "", true, &["firstName", "lastName"]),
            StepConfig::new("Symptoms", "", false, &["notes"]),
        ])
        .unwrap();
        let assembler = SubmissionAssembler::new(
            vec![
                FieldMapping::new("firstName", "first_name"),
                FieldMapping::new("lastName", "last_name"),
                FieldMapping::new("notes", "notes"),
            ],
            PriorityRules::default(),
        )
        .with_free_text_fields(["notes"]);

        WizardController::new(
            steps,
            assembler,
            Box::new(FakeAudioInput::one_second()),
            Arc::new(transcriber),
            store,
        )
        .unwrap()
    }

    struct Harness {
        commands: mpsc::Sender<WizardCommand>,
        events: mpsc::UnboundedReceiver<WizardEvent>,
        view: SharedView,
        task: tokio::task::JoinHandle<WizardController>,
    }

    fn spawn(controller: WizardController) -> Harness {
        let (commands, commands_rx) = mpsc::channel(16);
        let (events_tx, events) = mpsc::unbounded_channel();
        let view = new_shared_view();
        let orchestrator = WizardOrchestrator::new(controller, Arc::clone(&view), events_tx);
        let task = tokio::spawn(orchestrator.run(commands_rx));
        Harness {
            commands,
            events,
            view,
            task,
        }
    }

    impl Harness {
        async fn send(&self, command: WizardCommand) {
            self.commands.send(command).await.unwrap();
        }

        async fn set(&self, field: &str, value: &str) {
            self.send(WizardCommand::SetValue {
                field: field.into(),
                value: value.into(),
            })
            .await;
        }

        async fn next_event(&mut self) -> WizardEvent {
            tokio::time::timeout(Duration::from_secs(5), self.events.recv())
                .await
                .expect("event in time")
                .expect("orchestrator alive")
        }

        /// Skip `ValueSet` noise.
        async fn next_notable(&mut self) -> WizardEvent {
            loop {
                match self.next_event().await {
                    WizardEvent::ValueSet { .. } => continue,
                    other => return other,
                }
            }
        }

        async fn shutdown(self) -> WizardController {
            drop(self.commands);
            self.task.await.unwrap()
        }
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn happy_path_submits_and_clears() {
        let store = Arc::new(MemoryStore::default());
        let mut h = spawn(controller(MockTranscriber::ok(""), Arc::clone(&store)));

        h.set("firstName", "John").await;
        h.set("lastName", "Doe").await;
        h.send(WizardCommand::Next).await;
        assert_eq!(h.next_notable().await, WizardEvent::StepChanged { from: 0, to: 1 });

        h.send(WizardCommand::Next).await;
        assert_eq!(
            h.next_notable().await,
            WizardEvent::Submitted {
                id: "req-1".into(),
                priority: Priority::Normal
            }
        );

        let view = read_view(&h.view);
        assert_eq!(view.confirmation, Some(("req-1".into(), Priority::Normal)));

        let controller = h.shutdown().await;
        assert!(controller.answers().is_empty());
        assert_eq!(store.created().len(), 1);
    }

    #[tokio::test]
    async fn validation_block_lists_missing_fields() {
        let mut h = spawn(controller(MockTranscriber::ok(""), Arc::default()));

        h.set("firstName", "John").await;
        h.send(WizardCommand::Next).await;
        assert_eq!(
            h.next_notable().await,
            WizardEvent::ValidationBlocked {
                missing: vec!["lastName".into()]
            }
        );

        let view = read_view(&h.view);
        assert_eq!(view.step_index, 0);
        assert!(!view.can_advance);
        h.shutdown().await;
    }

    #[tokio::test]
    async fn voice_fills_field_and_view() {
        let mut h = spawn(controller(
            MockTranscriber::ok("sharp chest pain"),
            Arc::default(),
        ));

        h.send(WizardCommand::StartVoice {
            field: "notes".into(),
        })
        .await;
        assert_eq!(
            h.next_notable().await,
            WizardEvent::VoiceStarted {
                field: "notes".into()
            }
        );

        h.send(WizardCommand::StopVoice).await;
        assert_eq!(
            h.next_notable().await,
            WizardEvent::VoiceTranscribing {
                field: "notes".into(),
                capped: false
            }
        );
        assert_eq!(
            h.next_notable().await,
            WizardEvent::VoiceFilled {
                field: "notes".into(),
                text: "sharp chest pain".into()
            }
        );

        let view = read_view(&h.view);
        assert_eq!(view.voice, VoiceState::Idle);

        let controller = h.shutdown().await;
        assert_eq!(controller.value("notes"), Some("sharp chest pain"));
    }

    #[tokio::test]
    async fn voice_failure_is_reported_and_answers_kept() {
        let mut h = spawn(controller(
            MockTranscriber::err(TranscriptionError::Timeout),
            Arc::default(),
        ));

        h.set("notes", "typed").await;
        h.send(WizardCommand::StartVoice {
            field: "notes".into(),
        })
        .await;
        h.send(WizardCommand::StopVoice).await;

        h.next_notable().await; // VoiceStarted
        h.next_notable().await; // VoiceTranscribing
        assert!(matches!(
            h.next_notable().await,
            WizardEvent::VoiceFailed { .. }
        ));

        let controller = h.shutdown().await;
        assert_eq!(controller.value("notes"), Some("typed"));
    }

    #[tokio::test]
    async fn typing_and_second_capture_while_transcribing() {
        let mut h = spawn(controller(MockTranscriber::hanging(), Arc::default()));

        h.send(WizardCommand::StartVoice {
            field: "notes".into(),
        })
        .await;
        h.send(WizardCommand::StopVoice).await;
        h.next_notable().await;
        h.next_notable().await;

        h.set("firstName", "Ann").await;
        assert_eq!(
            h.next_event().await,
            WizardEvent::ValueSet {
                field: "firstName".into()
            }
        );

        h.send(WizardCommand::StartVoice {
            field: "lastName".into(),
        })
        .await;
        assert_eq!(
            h.next_notable().await,
            WizardEvent::Rejected {
                reason: WizardError::ConcurrentOperationRejected(Activity::VoiceCapture)
                    .to_string()
            }
        );

        h.send(WizardCommand::CancelVoice).await;
        assert_eq!(
            h.next_notable().await,
            WizardEvent::VoiceCancelled {
                field: "notes".into()
            }
        );

        let controller = h.shutdown().await;
        assert_eq!(controller.value("firstName"), Some("Ann"));
        assert_eq!(controller.value("notes"), None);
    }

    #[tokio::test]
    async fn recording_cap_stops_automatically() {
        let c = controller(MockTranscriber::ok("capped"), Arc::default()).with_voice_limits(
            VoiceLimits {
                min_recording_secs: 0.0,
                max_recording: Duration::from_millis(20),
            },
        );
        let mut h = spawn(c);

        h.send(WizardCommand::StartVoice {
            field: "notes".into(),
        })
        .await;
        h.next_notable().await;
        assert_eq!(
            h.next_notable().await,
            WizardEvent::VoiceTranscribing {
                field: "notes".into(),
                capped: true
            }
        );
        assert_eq!(
            h.next_notable().await,
            WizardEvent::VoiceFilled {
                field: "notes".into(),
                text: "capped".into()
            }
        );
        h.shutdown().await;
    }

    #[tokio::test]
    async fn failed_submission_can_be_retried() {
        let store = Arc::new(MemoryStore::failing_once(StoreError::Rejected {
            status: 503,
            message: "unavailable".into(),
        }));
        let mut h = spawn(controller(MockTranscriber::ok(""), Arc::clone(&store)));

        h.set("firstName", "John").await;
        h.set("lastName", "Doe").await;
        h.send(WizardCommand::Next).await;
        h.next_notable().await;

        h.send(WizardCommand::Submit).await;
        assert!(matches!(
            h.next_notable().await,
            WizardEvent::SubmissionFailed { .. }
        ));
        assert!(read_view(&h.view).last_error.is_some());

        h.send(WizardCommand::Submit).await;
        assert!(matches!(
            h.next_notable().await,
            WizardEvent::Submitted { .. }
        ));
        h.shutdown().await;
        assert_eq!(store.created().len(), 1);
    }

    #[tokio::test]
    async fn back_at_first_step_is_blocked() {
        let mut h = spawn(controller(MockTranscriber::ok(""), Arc::default()));
        h.send(WizardCommand::Back).await;
        assert_eq!(
            h.next_notable().await,
            WizardEvent::Blocked(BlockReason::AtFirstStep)
        );
        h.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_cancels_active_capture() {
        let h = spawn(controller(MockTranscriber::hanging(), Arc::default()));
        h.send(WizardCommand::StartVoice {
            field: "notes".into(),
        })
        .await;

        let controller = h.shutdown().await;
        assert_eq!(controller.voice_state(), VoiceState::Idle);
    }
}
