//! Speech-to-text for voice answers.
//!
//! # Architecture
//!
//! ```text
//! VoiceCaptureSession ──AudioClip──▶ Arc<dyn Transcriber>
//!                                        │
//!                                        └─ HttpTranscriber ──POST──▶ edge function
//! ```
//!
//! The session spawns the `transcribe` call onto the tokio runtime so the
//! user can keep typing while it is in flight.

pub mod engine;
pub mod http;

// ── Public re-exports ──────────────────────────────────────────────────────

#[cfg(test)]
pub use engine::MockTranscriber;
pub use engine::{Transcriber, TranscriptionError};
pub use http::HttpTranscriber;
