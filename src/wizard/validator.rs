//! Step gating.  Pure functions, cheap enough to run on every keystroke.

use crate::wizard::answers::AnswerMap;
use crate::wizard::step::WizardStep;

/// `true` when the user may move forward from `step`.
///
/// Optional steps always pass; required steps need a value in every field.
pub fn can_advance(step: &WizardStep, answers: &AnswerMap) -> bool {
    !step.is_required() || step.field_keys().iter().all(|key| answers.has_value(key))
}

/// Fields that still block a required step, in step order.  Empty for
/// optional steps.
pub fn missing_fields<'a>(step: &'a WizardStep, answers: &AnswerMap) -> Vec<&'a str> {
    if !step.is_required() {
        return Vec::new();
    }
    step.field_keys()
        .iter()
        .filter(|key| !answers.has_value(key))
        .map(String::as_str)
        .collect()
}
