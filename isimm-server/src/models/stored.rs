//! Storage models for MongoDB.
//!
//! These types mirror the documents in the events collection.

use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId};
use serde::{Deserialize, Serialize};

use isimm_common::{Event, EventRecord};

/// Event document as stored in the collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDocument {
    /// Assigned by the store on insert
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub title: String,

    pub description: String,

    pub date: String,

    pub location: String,

    #[serde(default)]
    pub attendees: i64,

    #[serde(default)]
    pub images: Vec<String>,

    pub created_at: bson::DateTime,

    pub updated_at: bson::DateTime,
}

impl EventDocument {
    /// Convert a record into an insertable document (no id yet)
    pub fn from_record(record: &EventRecord) -> Self {
        EventDocument {
            id: None,
            title: record.title.clone(),
            description: record.description.clone(),
            date: record.date.clone(),
            location: record.location.clone(),
            attendees: i64::from(record.attendees),
            images: record.images.clone(),
            created_at: to_bson_time(record.created_at),
            updated_at: to_bson_time(record.updated_at),
        }
    }

    /// Convert a fetched document into an API event
    pub fn into_event(self) -> Event {
        Event {
            id: self.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: self.title,
            description: self.description,
            date: self.date,
            location: self.location,
            attendees: u32::try_from(self.attendees).unwrap_or(0),
            images: self.images,
            created_at: from_bson_time(self.created_at),
            updated_at: from_bson_time(self.updated_at),
        }
    }
}

fn to_bson_time(at: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(at.timestamp_millis())
}

fn from_bson_time(at: bson::DateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(at.timestamp_millis()).unwrap_or_default()
}
