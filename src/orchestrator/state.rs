//! Read-only snapshot of the wizard for a UI to render.
//!
//! The orchestrator rebuilds [`WizardView`] after every command or voice
//! completion.  [`SharedView`] is a type alias for `Arc<Mutex<WizardView>>`,
//! cheap to clone and safe to read from another thread.

use std::sync::{Arc, Mutex, PoisonError};

use crate::intake::Priority;
use crate::voice::VoiceState;
use crate::wizard::WizardController;

/// One answer slot on the current step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldView {
    pub key: String,
    pub value: Option<String>,
    /// Blocks `Next` on a required step.
    pub missing: bool,
}

/// Everything a form needs to draw the current screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WizardView {
    pub step_index: usize,
    pub step_count: usize,
    pub title: String,
    pub prompt: String,
    pub required: bool,
    pub fields: Vec<FieldView>,
    /// Enables the Next button.
    pub can_advance: bool,
    /// The Next button reads "Submit".
    pub next_submits: bool,
    pub voice: VoiceState,
    pub voice_field: Option<String>,
    /// Seconds since recording started; `0.0` when not recording.
    pub recording_secs: f32,
    pub is_submitting: bool,
    /// Set after a successful submission until reset.
    pub confirmation: Option<(String, Priority)>,
    pub last_error: Option<String>,
}

impl WizardView {
    pub fn capture(controller: &WizardController) -> Self {
        let step = controller.current_step();
        let missing = controller.missing_fields();

        let fields = step
            .field_keys()
            .iter()
            .map(|key| FieldView {
                key: key.clone(),
                value: controller.value(key).map(str::to_string),
                missing: missing.contains(&key.as_str()),
            })
            .collect();

        Self {
            step_index: controller.current_index(),
            step_count: controller.step_count(),
            title: step.title().to_string(),
            prompt: step.prompt().to_string(),
            required: step.is_required(),
            fields,
            can_advance: controller.can_advance(),
            next_submits: controller.next_submits(),
            voice: controller.voice_state(),
            voice_field: controller.voice_field().map(str::to_string),
            recording_secs: controller
                .voice_elapsed()
                .map_or(0.0, |d| d.as_secs_f32()),
            is_submitting: controller.is_submitting(),
            confirmation: controller
                .confirmation()
                .map(|c| (c.id.clone(), c.priority)),
            last_error: controller.last_error().map(str::to_string),
        }
    }
}

/// Thread-safe handle to [`WizardView`].
///
/// Lock for a short critical section only; never hold the lock across an
/// `.await`.
pub type SharedView = Arc<Mutex<WizardView>>;

pub fn new_shared_view() -> SharedView {
    Arc::new(Mutex::new(WizardView::default()))
}

/// Copy the current snapshot out of `view`, recovering from a poisoned lock.
pub fn read_view(view: &SharedView) -> WizardView {
    view.lock().unwrap_or_else(PoisonError::into_inner).clone()
}
