//! Shared types for the IEEE CS ISIMM site backend.
//!
//! This crate contains the types that cross the HTTP boundary:
//! - events, from the raw creation payload to the stored record
//! - contact form submissions and their field validation
//! - the `{ success, data, message, ... }` response envelope
//!
//! Any change to the JSON shape of the API should be made here.

pub mod contact;
pub mod event;
pub mod response;

pub use contact::{ContactForm, ContactMessage, ValidationIssues};
pub use event::{sort_newest_first, Event, EventDraft, EventRecord, MissingFields, NewEvent};
pub use response::ApiResponse;
