//! In-process event store for local development without a database.
//!
//! Events live only as long as the process.

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;
use tracing::debug;

use isimm_common::{sort_newest_first, Event, EventRecord};

use super::{EventStore, StoreError};

#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<Event>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let mut events = self.events.read().await.clone();
        sort_newest_first(&mut events);
        Ok(events)
    }

    async fn insert_event(&self, record: EventRecord) -> Result<Event, StoreError> {
        // same id shape as documents inserted into MongoDB
        let event = record.with_id(ObjectId::new().to_hex());
        self.events.write().await.push(event.clone());

        debug!("Stored event {} in memory", event.id);
        Ok(event)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn connection_state(&self) -> &'static str {
        "connected"
    }

    async fn close(&self) {}
}
