//! Voice-assisted intake wizard.
//!
//! A multi-step form whose answers can be typed or dictated.  Each step
//! gates forward navigation on its required fields; the last step sends the
//! answers, with a keyword-derived priority, to an external record store.
//!
//! * [`wizard`] — answers, steps, validation and the controller.
//! * [`voice`] — one recording → transcript session per field.
//! * [`audio`] — capture device seam and the single-device lock.
//! * [`stt`] — transcription client.
//! * [`intake`] — outbound record assembly and priority rules.
//! * [`store`] — record store client.
//! * [`orchestrator`] — async command loop and UI snapshot.
//! * [`config`] — `settings.toml`.

pub mod audio;
pub mod config;
pub mod intake;
pub mod orchestrator;
pub mod store;
pub mod stt;
pub mod voice;
pub mod wizard;
