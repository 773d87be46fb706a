//! Turns the wizard's answers into the record written to the store.
//!
//! [`SubmissionAssembler::assemble`] is pure: it maps answer keys to store
//! attributes, merges the configured static attributes and classifies the
//! priority from free-text answers.  [`SubmissionAssembler::submit`] adds a
//! single `RecordStore::create` call on top and nothing else; clearing the
//! answers after success is the controller's job.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::IntakeConfig;
use crate::intake::priority::{Priority, PriorityRules};
use crate::store::{RecordStore, StoreError};
use crate::wizard::AnswerMap;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Routes one answer slot to one store attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub field: String,
    pub attribute: String,
}

impl FieldMapping {
    pub fn new(field: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            attribute: attribute.into(),
        }
    }
}

/// Flat record sent to the store.  Serializes as a JSON object of its
/// attributes; the priority is also present there under the configured
/// attribute name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundRecord {
    #[serde(flatten)]
    pub attributes: BTreeMap<String, String>,
    #[serde(skip)]
    pub priority: Priority,
}

impl OutboundRecord {
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.attributes.get(attribute).map(String::as_str)
    }
}

/// What the user sees after a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub id: String,
    pub priority: Priority,
    pub record: OutboundRecord,
}

/// The final store write failed.  Answers are kept so the user can resubmit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmissionError {
    #[error("could not save the intake: {0}")]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// SubmissionAssembler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SubmissionAssembler {
    mappings: Vec<FieldMapping>,
    free_text_fields: Vec<String>,
    static_attributes: BTreeMap<String, String>,
    priority_attribute: String,
    rules: PriorityRules,
}

impl SubmissionAssembler {
    pub fn new(mappings: Vec<FieldMapping>, rules: PriorityRules) -> Self {
        Self {
            mappings,
            free_text_fields: Vec::new(),
            static_attributes: BTreeMap::new(),
            priority_attribute: "priority".into(),
            rules,
        }
    }

    pub fn from_config(config: &IntakeConfig) -> Self {
        Self {
            mappings: config.mappings.clone(),
            free_text_fields: config.free_text_fields.clone(),
            static_attributes: config.static_attributes.clone(),
            priority_attribute: config.priority_attribute.clone(),
            rules: config.priority.clone(),
        }
    }

    /// Restrict priority scanning to these answer keys.  With none set every
    /// answer is scanned.
    pub fn with_free_text_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.free_text_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_static_attribute(
        mut self,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.static_attributes.insert(attribute.into(), value.into());
        self
    }

    /// `true` when `field` has a destination attribute.
    pub fn maps(&self, field: &str) -> bool {
        self.mappings.iter().any(|m| m.field == field)
    }

    /// Build the outbound record for `answers`.
    pub fn assemble(&self, answers: &AnswerMap) -> OutboundRecord {
        let mut attributes = self.static_attributes.clone();

        for mapping in &self.mappings {
            if let Some(value) = answers.get_value(&mapping.field) {
                let value = value.trim();
                if !value.is_empty() {
                    attributes.insert(mapping.attribute.clone(), value.to_string());
                }
            }
        }

        let priority = if self.free_text_fields.is_empty() {
            self.rules.classify(answers.iter().map(|(_, v)| v))
        } else {
            self.rules.classify(
                self.free_text_fields
                    .iter()
                    .filter_map(|field| answers.get_value(field)),
            )
        };
        attributes.insert(self.priority_attribute.clone(), priority.as_str().to_string());

        OutboundRecord {
            attributes,
            priority,
        }
    }

    /// Assemble and write once to `store`.  No retries.
    pub async fn submit(
        &self,
        answers: &AnswerMap,
        store: &dyn RecordStore,
    ) -> Result<Confirmation, SubmissionError> {
        let record = self.assemble(answers);
        log::debug!(
            "intake: submitting record with {} attributes (priority {})",
            record.attributes.len(),
            record.priority
        );

        let id = store.create(&record).await?;
        Ok(Confirmation {
            id,
            priority: record.priority,
            record,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingStore {
        seen: Mutex<Vec<OutboundRecord>>,
        result: Result<String, StoreError>,
    }

    #[async_trait]
    impl RecordStore for RecordingStore {
        async fn create(&self, record: &OutboundRecord) -> Result<String, StoreError> {
            self.seen.lock().unwrap().push(record.clone());
            self.result.clone()
        }
    }

    fn assembler() -> SubmissionAssembler {
        SubmissionAssembler::new(
            vec![
                FieldMapping::new("firstName", "first_name"),
                FieldMapping::new("notes", "notes"),
            ],
            PriorityRules::default(),
        )
        .with_free_text_fields(["notes"])
    }

    fn answers(pairs: &[(&str, &str)]) -> AnswerMap {
        let mut map = AnswerMap::new();
        for (k, v) in pairs {
            map.set_value(*k, *v);
        }
        map
    }

    #[test]
    fn maps_fields_and_ignores_unmapped() {
        let record = assembler().assemble(&answers(&[
            ("firstName", " John "),
            ("favouriteColour", "blue"),
        ]));
        assert_eq!(record.get("first_name"), Some("John"));
        assert_eq!(record.get("favouriteColour"), None);
        assert_eq!(record.get("notes"), None);
    }

    #[test]
    fn blank_answers_are_omitted() {
        let record = assembler().assemble(&answers(&[("firstName", "   ")]));
        assert_eq!(record.get("first_name"), None);
    }

    #[test]
    fn severe_transcript_sets_high_priority() {
        let record = assembler().assemble(&answers(&[("notes", "my pain is severe")]));
        assert_eq!(record.priority, Priority::High);
        assert_eq!(record.get("priority"), Some("high"));
    }

    #[test]
    fn no_keyword_gives_default_priority() {
        let record = assembler().assemble(&answers(&[("notes", "a little stiff")]));
        assert_eq!(record.priority, Priority::Normal);
        assert_eq!(record.get("priority"), Some("normal"));
    }

    #[test]
    fn only_free_text_fields_are_scanned() {
        let record = assembler().assemble(&answers(&[
            ("firstName", "Severe"),
            ("notes", "fine"),
        ]));
        assert_eq!(record.priority, Priority::Normal);
    }

    #[test]
    fn scans_all_answers_when_no_free_text_fields() {
        let asm = SubmissionAssembler::new(vec![], PriorityRules::default());
        let record = asm.assemble(&answers(&[("anything", "EMERGENCY")]));
        assert_eq!(record.priority, Priority::High);
    }

    #[test]
    fn static_attributes_are_merged() {
        let asm = assembler().with_static_attribute("status", "pending");
        let record = asm.assemble(&answers(&[("firstName", "Ann")]));
        assert_eq!(record.get("status"), Some("pending"));
    }

    #[test]
    fn record_serializes_flat() {
        let record = assembler().assemble(&answers(&[("firstName", "Ann")]));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "first_name": "Ann", "priority": "normal" })
        );
    }

    #[tokio::test]
    async fn submit_returns_confirmation() {
        let store = RecordingStore {
            seen: Mutex::new(Vec::new()),
            result: Ok("rec-1".into()),
        };
        let conf = assembler()
            .submit(&answers(&[("notes", "worst headache")]), &store)
            .await
            .unwrap();
        assert_eq!(conf.id, "rec-1");
        assert_eq!(conf.priority, Priority::High);
        assert_eq!(store.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn submit_failure_is_not_retried() {
        let store = RecordingStore {
            seen: Mutex::new(Vec::new()),
            result: Err(StoreError::Timeout),
        };
        let err = assembler()
            .submit(&answers(&[("firstName", "Ann")]), &store)
            .await
            .unwrap_err();
        assert_eq!(err, SubmissionError::Store(StoreError::Timeout));
        assert_eq!(store.seen.lock().unwrap().len(), 1);
    }
}
