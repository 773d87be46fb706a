//! Async driver for the wizard.
//!
//! This module connects a command source (console, UI) to a
//! [`WizardController`](crate::wizard::WizardController) and exposes the
//! snapshot a UI reads.
//!
//! # Architecture
//!
//! ```text
//! WizardCommand (mpsc)
//!        │
//!        ▼
//! WizardOrchestrator::run()  ← async tokio task
//!        │
//!        ├─ SetValue / Next / Back / Submit / Reset → controller
//!        ├─ StartVoice / StopVoice / CancelVoice    → voice slot
//!        └─ transcription done / recording cap      → controller
//!
//! WizardEvent (unbounded mpsc) ───▶ console / UI notifications
//! SharedView (Arc<Mutex<WizardView>>) ◀── read by the UI
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use voice_intake::audio::UnavailableInput;
//! use voice_intake::config::AppConfig;
//! use voice_intake::orchestrator::{new_shared_view, WizardCommand, WizardOrchestrator};
//! use voice_intake::store::RestStore;
//! use voice_intake::stt::HttpTranscriber;
//! use voice_intake::wizard::WizardController;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::default();
//!     let controller = WizardController::from_config(
//!         &config,
//!         Box::new(UnavailableInput),
//!         Arc::new(HttpTranscriber::from_config(&config.transcription)),
//!         Arc::new(RestStore::from_config(&config.store)),
//!     )?;
//!
//!     let (commands_tx, commands_rx) = mpsc::channel(16);
//!     let (events_tx, _events_rx) = mpsc::unbounded_channel();
//!     let orchestrator = WizardOrchestrator::new(controller, new_shared_view(), events_tx);
//!     let task = tokio::spawn(orchestrator.run(commands_rx));
//!
//!     commands_tx.send(WizardCommand::Next).await?;
//!     drop(commands_tx);
//!     task.await?;
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use command::{CommandError, WizardCommand, WizardEvent};
pub use runner::WizardOrchestrator;
pub use state::{new_shared_view, read_view, FieldView, SharedView, WizardView};
