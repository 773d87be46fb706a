//! Step definitions.
//!
//! Steps come from configuration ([`StepConfig`]) and are frozen into
//! [`WizardStep`]s once, when the wizard is built.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_required() -> bool {
    true
}

/// One `[[wizard.steps]]` entry in `settings.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    pub title: String,
    /// Question shown to the user.
    #[serde(default)]
    pub prompt: String,
    #[serde(default = "default_required")]
    pub required: bool,
    pub fields: Vec<String>,
}

impl StepConfig {
    pub fn new(title: &str, prompt: &str, required: bool, fields: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            prompt: prompt.to_string(),
            required,
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Rejected step configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepConfigError {
    #[error("the wizard needs at least one step")]
    NoSteps,

    #[error("step {index} has no fields")]
    EmptyStep { index: usize },

    #[error("step {index} has a blank field key")]
    BlankFieldKey { index: usize },

    #[error("field key {key:?} is used more than once")]
    DuplicateFieldKey { key: String },
}

/// One screen of the flow.  Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardStep {
    index: usize,
    title: String,
    prompt: String,
    field_keys: Vec<String>,
    is_required: bool,
}

impl WizardStep {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn field_keys(&self) -> &[String] {
        &self.field_keys
    }

    pub fn is_required(&self) -> bool {
        self.is_required
    }
}

/// Freeze `configs` into indexed steps.
///
/// Field keys are trimmed and must be unique across the whole wizard, since
/// they share one answer map.
pub fn build_steps(configs: &[StepConfig]) -> Result<Vec<WizardStep>, StepConfigError> {
    if configs.is_empty() {
        return Err(StepConfigError::NoSteps);
    }

    let mut seen = HashSet::new();
    let mut steps = Vec::with_capacity(configs.len());

    for (index, cfg) in configs.iter().enumerate() {
        if cfg.fields.is_empty() {
            return Err(StepConfigError::EmptyStep { index });
        }

        let mut field_keys = Vec::with_capacity(cfg.fields.len());
        for raw in &cfg.fields {
            let key = raw.trim();
            if key.is_empty() {
                return Err(StepConfigError::BlankFieldKey { index });
            }
            if !seen.insert(key.to_string()) {
                return Err(StepConfigError::DuplicateFieldKey {
                    key: key.to_string(),
                });
            }
            field_keys.push(key.to_string());
        }

        steps.push(WizardStep {
            index,
            title: cfg.title.clone(),
            prompt: cfg.prompt.clone(),
            field_keys,
            is_required: cfg.required,
        });
    }

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_indexed_steps() {
        let steps = build_steps(&[
            StepConfig::new("Name", "Who are you?", true, &["firstName", "lastName"]),
            StepConfig::new("Notes", "Anything else?", false, &["notes"]),
        ])
        .unwrap();

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].index(), 0);
        assert_eq!(steps[1].index(), 1);
        assert_eq!(steps[0].field_keys(), ["firstName", "lastName"]);
        assert!(steps[0].is_required());
        assert!(!steps[1].is_required());
        assert_eq!(steps[1].prompt(), "Anything else?");
    }

    #[test]
    fn empty_configuration_is_rejected() {
        assert_eq!(build_steps(&[]), Err(StepConfigError::NoSteps));
    }

    #[test]
    fn step_without_fields_is_rejected() {
        let err = build_steps(&[
            StepConfig::new("A", "", true, &["a"]),
            StepConfig::new("B", "", true, &[]),
        ])
        .unwrap_err();
        assert_eq!(err, StepConfigError::EmptyStep { index: 1 });
    }

    #[test]
    fn blank_key_is_rejected() {
        let err = build_steps(&[StepConfig::new("A", "", true, &["  "])]).unwrap_err();
        assert_eq!(err, StepConfigError::BlankFieldKey { index: 0 });
    }

    #[test]
    fn duplicate_key_across_steps_is_rejected() {
        let err = build_steps(&[
            StepConfig::new("A", "", true, &["phone"]),
            StepConfig::new("B", "", true, &[" phone "]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            StepConfigError::DuplicateFieldKey {
                key: "phone".into()
            }
        );
    }

    #[test]
    fn required_defaults_to_true_in_toml() {
        let cfg: StepConfig = toml::from_str(
            r#"
            title = "Contact"
            fields = ["phone"]
            "#,
        )
        .unwrap();
        assert!(cfg.required);
        assert_eq!(cfg.prompt, "");
    }
}
