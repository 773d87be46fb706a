//! Messages into and out of the orchestrator.

use thiserror::Error;

use crate::intake::Priority;
use crate::wizard::BlockReason;

/// A user request.  Sent to [`WizardOrchestrator::run`](super::WizardOrchestrator::run)
/// over a `tokio::sync::mpsc` channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardCommand {
    SetValue { field: String, value: String },
    StartVoice { field: String },
    StopVoice,
    CancelVoice,
    Next,
    Back,
    Submit,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command {0:?}")]
    Unknown(String),

    #[error("`{command}` needs a {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
}

impl WizardCommand {
    /// Parse one console line.
    ///
    /// ```
    /// use voice_intake::orchestrator::WizardCommand;
    ///
    /// assert_eq!(
    ///     WizardCommand::parse("set firstName Mary Ann").unwrap(),
    ///     WizardCommand::SetValue { field: "firstName".into(), value: "Mary Ann".into() }
    /// );
    /// assert_eq!(WizardCommand::parse("next").unwrap(), WizardCommand::Next);
    /// ```
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let field = |command| {
            rest.split_whitespace()
                .next()
                .map(str::to_string)
                .ok_or(CommandError::MissingArgument {
                    command,
                    argument: "field",
                })
        };

        match word.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "set" => {
                let field = field("set")?;
                let value = rest[field.len()..].trim().to_string();
                Ok(WizardCommand::SetValue { field, value })
            }
            "voice" | "speak" => Ok(WizardCommand::StartVoice {
                field: field("voice")?,
            }),
            "stop" => Ok(WizardCommand::StopVoice),
            "cancel" => Ok(WizardCommand::CancelVoice),
            "next" => Ok(WizardCommand::Next),
            "back" => Ok(WizardCommand::Back),
            "submit" => Ok(WizardCommand::Submit),
            "reset" => Ok(WizardCommand::Reset),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Something the user should hear about.  Values and transcripts appear
/// here for display only; they are never logged.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardEvent {
    ValueSet { field: String },
    StepChanged { from: usize, to: usize },
    /// `Next` on a required step with unanswered fields.
    ValidationBlocked { missing: Vec<String> },
    Blocked(BlockReason),
    /// A request was refused outright (busy, device in use, no capture).
    Rejected { reason: String },
    VoiceStarted { field: String },
    /// Recording ended; `capped` is set when the length cap stopped it.
    VoiceTranscribing { field: String, capped: bool },
    VoiceFilled { field: String, text: String },
    VoiceFailed { field: String, error: String },
    VoiceCancelled { field: String },
    Submitted { id: String, priority: Priority },
    SubmissionFailed { error: String },
    Reset,
}
