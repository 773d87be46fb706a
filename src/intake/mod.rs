//! Submission side of the wizard.
//!
//! * [`SubmissionAssembler`] — answers → [`OutboundRecord`] → `RecordStore`.
//! * [`PriorityRules`] / [`Priority`] — keyword table that derives the
//!   record's urgency from free-text answers.
//! * [`SubmissionError`] — the store write failed; answers are preserved.

pub mod assembler;
pub mod priority;

pub use assembler::{Confirmation, FieldMapping, OutboundRecord, SubmissionAssembler, SubmissionError};
pub use priority::{Priority, PriorityRule, PriorityRules};
