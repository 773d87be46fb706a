//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files.  Missing sections and
//! missing keys inside a section fall back to their defaults, so a
//! `settings.toml` that only overrides the store URL is valid.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::intake::{FieldMapping, PriorityRules};
use crate::wizard::StepConfig;

// ---------------------------------------------------------------------------
// WizardConfig
// ---------------------------------------------------------------------------

/// The ordered list of wizard screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    pub steps: Vec<StepConfig>,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            steps: vec![
                StepConfig::new(
                    "Patient details",
                    "What is your first and last name?",
                    true,
                    &["firstName", "lastName"],
                ),
                StepConfig::new(
                    "Contact",
                    "How can we reach you?",
                    true,
                    &["phone", "email"],
                ),
                StepConfig::new(
                    "Visit",
                    "Which service do you need, and when?",
                    true,
                    &["service", "preferredDate"],
                ),
                StepConfig::new(
                    "Symptoms",
                    "Describe your symptoms in your own words.",
                    false,
                    &["notes"],
                ),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceConfig
// ---------------------------------------------------------------------------

/// Limits applied to every voice capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Clips shorter than this are rejected without calling the service.
    pub min_recording_secs: f32,
    /// Recording stops automatically after this many seconds.
    pub max_recording_secs: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            min_recording_secs: 0.5,
            max_recording_secs: 60.0,
        }
    }
}

// ---------------------------------------------------------------------------
// TranscriptionConfig
// ---------------------------------------------------------------------------

/// Connection settings for the speech-to-text function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub base_url: String,
    /// Path appended to `base_url`.
    pub path: String,
    /// Sent as both `apikey` and bearer token.  `None` for local stacks.
    pub api_key: Option<String>,
    /// ISO-639-1 code passed to the service.
    pub language: String,
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".into(),
            path: "/functions/v1/transcribe-audio".into(),
            api_key: None,
            language: "en".into(),
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

/// Connection settings for the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub base_url: String,
    /// Table the intake records are inserted into.
    pub table: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".into(),
            table: "intake_requests".into(),
            api_key: None,
            timeout_secs: 15,
        }
    }
}

// ---------------------------------------------------------------------------
// IntakeConfig
// ---------------------------------------------------------------------------

/// How answers become an outbound record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Attribute that receives the classified priority.
    pub priority_attribute: String,
    /// Answer keys scanned for priority keywords.  Empty = scan all answers.
    pub free_text_fields: Vec<String>,
    /// Attributes added to every record (e.g. `status = "pending"`).
    pub static_attributes: BTreeMap<String, String>,
    pub mappings: Vec<FieldMapping>,
    pub priority: PriorityRules,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        let mut static_attributes = BTreeMap::new();
        static_attributes.insert("status".to_string(), "pending".to_string());
        static_attributes.insert("source".to_string(), "voice_intake".to_string());

        Self {
            priority_attribute: "priority".into(),
            free_text_fields: vec!["notes".into()],
            static_attributes,
            mappings: vec![
                FieldMapping::new("firstName", "first_name"),
                FieldMapping::new("lastName", "last_name"),
                FieldMapping::new("phone", "phone"),
                FieldMapping::new("email", "email"),
                FieldMapping::new("service", "service_type"),
                FieldMapping::new("preferredDate", "preferred_date"),
                FieldMapping::new("notes", "notes"),
            ],
            priority: PriorityRules::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voice_intake::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Wizard screens and their fields.
    pub wizard: WizardConfig,
    /// Recording limits.
    pub voice: VoiceConfig,
    /// Speech-to-text endpoint.
    pub transcription: TranscriptionConfig,
    /// Record store endpoint.
    pub store: StoreConfig,
    /// Field mappings and priority rules.
    pub intake: IntakeConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// so callers never need to special-case a missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns `true` when no `settings.toml` file exists yet.
    pub fn is_first_run() -> bool {
        !AppPaths::new().settings_file.exists()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::Priority;
    use tempfile::tempdir;

    /// A default `AppConfig` survives a TOML round trip unchanged.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(original, loaded);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.wizard.steps.len(), 4);
        assert!(!cfg.wizard.steps[3].required);
        assert_eq!(cfg.voice.max_recording_secs, 60.0);
        assert_eq!(cfg.voice.min_recording_secs, 0.5);
        assert_eq!(cfg.transcription.language, "en");
        assert!(cfg.transcription.api_key.is_none());
        assert_eq!(cfg.store.table, "intake_requests");
        assert_eq!(cfg.intake.priority_attribute, "priority");
        assert_eq!(
            cfg.intake.static_attributes.get("status").map(String::as_str),
            Some("pending")
        );
    }

    /// Every field of the default steps has a destination attribute.
    #[test]
    fn default_steps_are_fully_mapped() {
        let cfg = AppConfig::default();
        for step in &cfg.wizard.steps {
            for field in &step.fields {
                assert!(
                    cfg.intake.mappings.iter().any(|m| &m.field == field),
                    "{field} is unmapped"
                );
            }
        }
    }

    /// A partial file overrides only what it names.
    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            r#"
            [store]
            base_url = "https://db.example.org"
            table = "bookings"
            timeout_secs = 5
            "#,
        )
        .expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.store.base_url, "https://db.example.org");
        assert_eq!(cfg.store.table, "bookings");
        assert!(cfg.store.api_key.is_none());
        assert_eq!(cfg.wizard, WizardConfig::default());
        assert_eq!(cfg.intake, IntakeConfig::default());
    }

    /// A section naming a single key keeps the defaults of its siblings.
    #[test]
    fn single_key_section_keeps_section_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[store]\nbase_url = \"https://db.example.org\"\n").expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.store.base_url, "https://db.example.org");
        assert_eq!(cfg.store.table, "intake_requests");
        assert_eq!(cfg.store.timeout_secs, 15);
        assert_eq!(cfg.transcription, TranscriptionConfig::default());
    }

    #[test]
    fn every_section_accepts_a_single_override() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            r#"
            [voice]
            max_recording_secs = 30.0

            [transcription]
            language = "th"

            [intake]
            priority_attribute = "urgency"

            [intake.priority]
            default_level = "low"
            "#,
        )
        .expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.voice.max_recording_secs, 30.0);
        assert_eq!(cfg.voice.min_recording_secs, 0.5);
        assert_eq!(cfg.transcription.language, "th");
        assert_eq!(cfg.transcription.timeout_secs, 30);
        assert_eq!(cfg.intake.priority_attribute, "urgency");
        assert_eq!(cfg.intake.mappings, IntakeConfig::default().mappings);
        assert_eq!(cfg.intake.priority.default_level, Priority::Low);
        assert_eq!(cfg.intake.priority.rules, PriorityRules::default().rules);
        assert_eq!(cfg.wizard, WizardConfig::default());
    }

    /// Modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.wizard.steps = vec![StepConfig::new("Only", "Name?", true, &["name"])];
        cfg.voice.max_recording_secs = 30.0;
        cfg.transcription.api_key = Some("anon-key".into());
        cfg.transcription.language = "th".into();
        cfg.store.timeout_secs = 3;
        cfg.intake.mappings = vec![FieldMapping::new("name", "full_name")];
        cfg.intake.priority.default_level = Priority::Low;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.wizard.steps[0].fields, vec!["name".to_string()]);
        assert_eq!(loaded.voice.max_recording_secs, 30.0);
        assert_eq!(loaded.transcription.api_key, Some("anon-key".into()));
        assert_eq!(loaded.transcription.language, "th");
        assert_eq!(loaded.store.timeout_secs, 3);
        assert_eq!(loaded.intake.mappings, vec![FieldMapping::new("name", "full_name")]);
        assert_eq!(loaded.intake.priority.default_level, Priority::Low);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[voice\nmax_recording_secs = ").expect("write");

        assert!(AppConfig::load_from(&path).is_err());
    }
}
