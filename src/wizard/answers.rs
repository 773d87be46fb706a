//! Answer slots filled by typing or by voice.
//!
//! [`AnswerMap`] never rejects input.  Whether a value is good enough to
//! move on is the step validator's call; keeping this type dumb means typed
//! and transcribed answers go through exactly the same path.

use std::collections::BTreeMap;

/// Field key → current value.  A key is present only once it has received
/// a value; absence means "unanswered".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerMap {
    values: BTreeMap<String, String>,
}

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the value for `key`.  Empty strings are stored as-is.
    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Present and non-blank after trimming.
    pub fn has_value(&self, key: &str) -> bool {
        self.get_value(key).is_some_and(|v| !v.trim().is_empty())
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
