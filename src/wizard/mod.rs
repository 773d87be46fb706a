//! The multi-step intake flow.
//!
//! * [`AnswerMap`] — field key → value, filled by typing or voice.
//! * [`WizardStep`] / [`build_steps`] — the frozen step list.
//! * [`can_advance`] / [`missing_fields`] — the per-step gate.
//! * [`WizardController`] — navigation, voice slot and submission.

pub mod answers;
pub mod controller;
pub mod step;
pub mod validator;

pub use answers::AnswerMap;
pub use controller::{
    Activity, BlockReason, Navigation, VoiceLimits, VoiceOutcome, WizardController, WizardError,
};
pub use step::{build_steps, StepConfig, StepConfigError, WizardStep};
pub use validator::{can_advance, missing_fields};
