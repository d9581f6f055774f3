//! Data models for the site server.

pub mod stored;

pub use stored::EventDocument;

// Re-export common types for convenience
pub use isimm_common::{ContactForm, Event, EventDraft};
