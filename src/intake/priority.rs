//! Keyword-based priority classification of free-text answers.
//!
//! [`PriorityRules`] is a data table: each [`PriorityRule`] names a level
//! and the keywords that trigger it.  Matching is a case-insensitive
//! substring test.  When several rules match, the highest level wins; when
//! none match, `default_level` applies.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Coarse urgency label attached to an outbound record.
///
/// Ordered `Low < Normal < High < Urgent`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// Value written into the record's priority attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PriorityRules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityRule {
    pub level: Priority,
    pub keywords: Vec<String>,
}

impl PriorityRule {
    fn matches(&self, haystack_lower: &str) -> bool {
        self.keywords.iter().any(|kw| {
            let kw = kw.trim();
            !kw.is_empty() && haystack_lower.contains(&kw.to_lowercase())
        })
    }
}

/// Classifier table.
///
/// # Example
/// ```rust
/// use voice_intake::intake::{Priority, PriorityRules};
///
/// let rules = PriorityRules::default();
/// assert_eq!(rules.classify(["My pain is SEVERE today"]), Priority::High);
/// assert_eq!(rules.classify(["routine check-up"]), Priority::Normal);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityRules {
    /// Level used when no rule matches.
    pub default_level: Priority,
    pub rules: Vec<PriorityRule>,
}

impl PriorityRules {
    /// Classify the combined `texts`.
    pub fn classify<'a, I>(&self, texts: I) -> Priority
    where
        I: IntoIterator<Item = &'a str>,
    {
        let lowered: Vec<String> = texts.into_iter().map(str::to_lowercase).collect();

        self.rules
            .iter()
            .filter(|rule| lowered.iter().any(|text| rule.matches(text)))
            .map(|rule| rule.level)
            .max()
            .unwrap_or(self.default_level)
    }
}

impl Default for PriorityRules {
    fn default() -> Self {
        Self {
            default_level: Priority::Normal,
            rules: vec![PriorityRule {
                level: Priority::High,
                keywords: [
                    "severe",
                    "emergency",
                    "urgent",
                    "unbearable",
                    "intense",
                    "worst",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            }],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
