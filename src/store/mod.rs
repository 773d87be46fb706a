//! External record store that receives completed intakes.
//!
//! [`RecordStore`] is the narrow create-only contract the wizard needs.
//! [`RestStore`] implements it against a PostgREST-style table endpoint;
//! tests substitute in-memory fakes.

pub mod rest;

use async_trait::async_trait;
use thiserror::Error;

use crate::intake::OutboundRecord;

pub use rest::RestStore;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Errors from a [`RecordStore`].  The wizard only distinguishes success from
/// failure; the variants exist for logs and the message shown to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Request(String),

    #[error("store request timed out")]
    Timeout,

    #[error("store rejected the record ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("failed to parse store response: {0}")]
    Parse(String),

    #[error("store response did not include a record id")]
    MissingId,
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StoreError::Timeout
        } else {
            StoreError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// RecordStore trait
// ---------------------------------------------------------------------------

/// Create-only access to the intake table.
///
/// `create` is called at most once per submit attempt; implementations must
/// not retry internally, since a retried insert can duplicate the record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist `record` and return the id assigned by the store.
    async fn create(&self, record: &OutboundRecord) -> Result<String, StoreError>;
}

// ---------------------------------------------------------------------------
// MemoryStore  (test-only)
// ---------------------------------------------------------------------------

/// In-memory store that keeps every created record and assigns sequential
/// ids.  Queued failures are returned first, one per call.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    created: std::sync::Mutex<Vec<OutboundRecord>>,
    failures: std::sync::Mutex<Vec<StoreError>>,
}

#[cfg(test)]
impl MemoryStore {
    /// Fails the first `create` with `error`, then succeeds.
    pub fn failing_once(error: StoreError) -> Self {
        Self {
            failures: std::sync::Mutex::new(vec![error]),
            ..Default::default()
        }
    }

    pub fn created(&self) -> Vec<OutboundRecord> {
        self.created.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, record: &OutboundRecord) -> Result<String, StoreError> {
        if let Some(error) = self.failures.lock().unwrap().pop() {
            return Err(error);
        }
        let mut created = self.created.lock().unwrap();
        created.push(record.clone());
        Ok(format!("req-{}", created.len()))
    }
}
