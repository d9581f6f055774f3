//! Event persistence.
//!
//! Handlers talk to an [`EventStore`]; the MongoDB implementation sits on top
//! of a [`ConnectionManager`] that owns the single shared database handle.

pub mod connection;
pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use thiserror::Error;

use isimm_common::{Event, EventRecord};

pub use connection::{ConnectionManager, Connector};
pub use memory::MemoryEventStore;
pub use mongo::MongoEventStore;

/// Errors surfaced by the persistence layer
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// Deployment problem, e.g. no connection string; fatal until fixed
    #[error("store is not configured: {0}")]
    Configuration(String),

    /// Handshake or liveness failure; the next request reconnects
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("{0} timed out after {1:?}")]
    Timeout(&'static str, std::time::Duration),

    #[error("database error: {0}")]
    Driver(#[from] mongodb::error::Error),
}

/// Storage for events
#[async_trait]
pub trait EventStore: Send + Sync {
    /// All events, newest `created_at` first
    async fn list_events(&self) -> Result<Vec<Event>, StoreError>;

    /// Insert a record and return it with its store-assigned id
    async fn insert_event(&self, record: EventRecord) -> Result<Event, StoreError>;

    /// Check that the store is reachable
    async fn ping(&self) -> Result<(), StoreError>;

    /// Label of the underlying connection state
    async fn connection_state(&self) -> &'static str;

    /// Release the underlying connection, if any
    async fn close(&self);
}
