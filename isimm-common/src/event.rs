//! Event types.
//!
//! An event moves through three shapes:
//! - [`EventDraft`]: whatever the client posted, every field optional
//! - [`NewEvent`]: a draft whose required fields are present, defaults applied
//! - [`EventRecord`] / [`Event`]: timestamped, and once stored, identified

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw event creation payload (`POST /events`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventDraft {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Free-form date, stored as given
    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub attendees: Option<u32>,

    #[serde(default)]
    pub images: Option<Vec<String>>,
}

/// Required fields that were absent or empty in a draft
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required fields: {}", .0.join(", "))]
pub struct MissingFields(pub Vec<&'static str>);

impl EventDraft {
    /// Check required fields and apply defaults.
    ///
    /// `title`, `description`, `date` and `location` must be present and
    /// non-empty. `attendees` defaults to 0 and `images` to an empty list.
    pub fn validate(self) -> Result<NewEvent, MissingFields> {
        let mut missing = Vec::new();

        let title = required("title", self.title, &mut missing);
        let description = required("description", self.description, &mut missing);
        let date = required("date", self.date, &mut missing);
        let location = required("location", self.location, &mut missing);

        if !missing.is_empty() {
            return Err(MissingFields(missing));
        }

        Ok(NewEvent {
            title,
            description,
            date,
            location,
            attendees: self.attendees.unwrap_or(0),
            images: self.images.unwrap_or_default(),
        })
    }
}

fn required(field: &'static str, value: Option<String>, missing: &mut Vec<&'static str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => {
            missing.push(field);
            String::new()
        }
    }
}

/// A validated event, not yet timestamped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub date: String,
    pub location: String,
    pub attendees: u32,
    pub images: Vec<String>,
}

impl NewEvent {
    /// Timestamp the event for insertion.
    ///
    /// `created_at` and `updated_at` are both set to `now`, truncated to
    /// milliseconds since that is what the document store keeps.
    pub fn stamp(self, now: DateTime<Utc>) -> EventRecord {
        let now = now.trunc_subsecs(3);

        EventRecord {
            title: self.title,
            description: self.description,
            date: self.date,
            location: self.location,
            attendees: self.attendees,
            images: self.images,
            created_at: now,
            updated_at: now,
        }
    }
}

/// An event ready to be inserted; the store assigns the id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub title: String,
    pub description: String,
    pub date: String,
    pub location: String,
    pub attendees: u32,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventRecord {
    /// Attach the store-assigned identifier
    pub fn with_id(self, id: String) -> Event {
        Event {
            id,
            title: self.title,
            description: self.description,
            date: self.date,
            location: self.location,
            attendees: self.attendees,
            images: self.images,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A stored event as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Store-assigned identifier
    #[serde(rename = "_id")]
    pub id: String,

    pub title: String,
    pub description: String,
    pub date: String,
    pub location: String,
    pub attendees: u32,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order events by `created_at`, newest first.
///
/// The sort is stable, so events sharing a timestamp keep their relative order.
pub fn sort_newest_first(events: &mut [Event]) {
    events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
