//! Application entry point — console front end for the intake wizard.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Build the audio input, transcriber and record store from config.
//! 4. Spawn the wizard orchestrator on the tokio runtime.
//! 5. Read commands from stdin and print events until `quit` or EOF.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use voice_intake::{
    audio::AudioInput,
    config::AppConfig,
    orchestrator::{
        new_shared_view, read_view, SharedView, WizardCommand, WizardEvent, WizardOrchestrator,
    },
    store::RestStore,
    stt::HttpTranscriber,
    wizard::WizardController,
};

const HELP: &str = "\
commands:
  set <field> <value>   type an answer
  voice <field>         start dictating into a field
  stop                  stop recording and transcribe
  cancel                abandon the current recording
  next | back           move between steps (next submits on the last step)
  submit                retry a failed submission
  reset                 start a new intake
  status                show the current step
  help | quit";

// ---------------------------------------------------------------------------
// Audio input
// ---------------------------------------------------------------------------

#[cfg(feature = "microphone")]
fn audio_input(config: &AppConfig) -> Box<dyn AudioInput> {
    Box::new(voice_intake::audio::Microphone::new(
        config.voice.max_recording_secs,
    ))
}

#[cfg(not(feature = "microphone"))]
fn audio_input(_config: &AppConfig) -> Box<dyn AudioInput> {
    log::warn!("built without the `microphone` feature; voice capture is unavailable");
    Box::new(voice_intake::audio::UnavailableInput)
}

// ---------------------------------------------------------------------------
// Console rendering
// ---------------------------------------------------------------------------

fn print_status(view: &SharedView) {
    let view = read_view(view);
    println!(
        "step {}/{}: {}{}",
        view.step_index + 1,
        view.step_count,
        view.title,
        if view.required { "" } else { " (optional)" }
    );
    if !view.prompt.is_empty() {
        println!("  {}", view.prompt);
    }
    for field in &view.fields {
        let marker = if field.missing { "*" } else { " " };
        println!(
            " {marker} {:<16} {}",
            field.key,
            field.value.as_deref().unwrap_or("")
        );
    }
    if view.voice.is_busy() {
        println!(
            "  voice: {} {}",
            view.voice,
            view.voice_field.as_deref().unwrap_or("")
        );
    }
    if let Some(error) = &view.last_error {
        println!("  last error: {error}");
    }
    if let Some((id, priority)) = &view.confirmation {
        println!("  submitted as {id} (priority {priority}); `reset` to start over");
    } else if view.next_submits {
        println!("  `next` will submit");
    }
}

fn print_event(event: &WizardEvent) {
    match event {
        WizardEvent::ValueSet { .. } => {}
        WizardEvent::StepChanged { to, .. } => println!("→ step {}", to + 1),
        WizardEvent::ValidationBlocked { missing } => {
            println!("! still needed: {}", missing.join(", "))
        }
        WizardEvent::Blocked(reason) => println!("! {reason}"),
        WizardEvent::Rejected { reason } => println!("! {reason}"),
        WizardEvent::VoiceStarted { field } => println!("● recording {field} (`stop` to finish)"),
        WizardEvent::VoiceTranscribing { field, capped } => {
            if *capped {
                println!("… recording limit reached, transcribing {field}");
            } else {
                println!("… transcribing {field}");
            }
        }
        WizardEvent::VoiceFilled { field, text } => println!("✓ {field} = {text}"),
        WizardEvent::VoiceFailed { field, error } => println!("✗ {field}: {error}"),
        WizardEvent::VoiceCancelled { field } => println!("recording for {field} cancelled"),
        WizardEvent::Submitted { id, priority } => {
            println!("✓ intake saved as {id} (priority {priority})")
        }
        WizardEvent::SubmissionFailed { error } => {
            println!("✗ {error}; your answers are kept, `submit` to retry")
        }
        WizardEvent::Reset => println!("new intake started"),
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("voice intake starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    if AppConfig::is_first_run() {
        if let Err(e) = config.save() {
            log::warn!("Could not write default settings: {e}");
        }
    }

    // 3. Collaborators
    let controller = WizardController::from_config(
        &config,
        audio_input(&config),
        Arc::new(HttpTranscriber::from_config(&config.transcription)),
        Arc::new(RestStore::from_config(&config.store)),
    )
    .context("invalid wizard configuration")?;

    // 4. Orchestrator
    let view = new_shared_view();
    let (command_tx, command_rx) = mpsc::channel::<WizardCommand>(16);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<WizardEvent>();
    let orchestrator = WizardOrchestrator::new(controller, Arc::clone(&view), event_tx);
    let orchestrator_task = tokio::spawn(orchestrator.run(command_rx));

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(&event);
        }
    });

    // 5. Console loop
    println!("{HELP}\n");
    print_status(&view);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => {}
            "quit" | "exit" => break,
            "help" => println!("{HELP}"),
            "status" => print_status(&view),
            other => match WizardCommand::parse(other) {
                Ok(command) => {
                    if command_tx.send(command).await.is_err() {
                        log::error!("orchestrator stopped unexpectedly");
                        break;
                    }
                }
                Err(e) => println!("! {e} (type `help`)"),
            },
        }
    }

    drop(command_tx);
    orchestrator_task.await?;
    printer.await?;
    log::info!("voice intake shut down");
    Ok(())
}
