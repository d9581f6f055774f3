//! MongoDB event store.

use std::future::IntoFuture;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use tracing::{debug, info, warn};

use isimm_common::{Event, EventRecord};

use super::{ConnectionManager, Connector, EventStore, StoreError};
use crate::config::MongoConfig;
use crate::models::EventDocument;

/// Database used when neither the config nor the URI names one
const FALLBACK_DATABASE: &str = "test";

/// Live MongoDB handle
#[derive(Clone)]
pub struct MongoHandle {
    pub client: Client,
    pub database: Database,
}

/// Opens MongoDB connections from the configured connection string
pub struct MongoConnector {
    config: MongoConfig,
}

impl MongoConnector {
    pub fn new(config: MongoConfig) -> Self {
        Self { config }
    }

    async fn client_options(&self) -> Result<ClientOptions, StoreError> {
        let uri = self
            .config
            .uri
            .as_deref()
            .ok_or_else(|| StoreError::Configuration("MONGODB_URI is not set".to_string()))?;

        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| StoreError::Configuration(format!("invalid MONGODB_URI: {}", e)))?;

        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.max_pool_size = Some(self.config.max_pool_size);
        options.server_selection_timeout = Some(self.config.server_selection_timeout);
        options.connect_timeout = Some(self.config.connect_timeout);
        options.max_idle_time = Some(self.config.max_idle_time);
        options.retry_writes = Some(true);
        options.retry_reads = Some(true);

        Ok(options)
    }
}

#[async_trait]
impl Connector for MongoConnector {
    type Handle = MongoHandle;

    async fn connect(&self) -> Result<MongoHandle, StoreError> {
        let options = self.client_options().await?;
        let client = Client::with_options(options)
            .map_err(|e| StoreError::Configuration(e.to_string()))?;

        // the driver connects lazily; ping to force the handshake now
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let database = match &self.config.database {
            Some(name) => client.database(name),
            None => client
                .default_database()
                .unwrap_or_else(|| client.database(FALLBACK_DATABASE)),
        };
        info!("Using database {}", database.name());

        Ok(MongoHandle { client, database })
    }

    async fn ping(&self, handle: &MongoHandle) -> Result<(), StoreError> {
        handle
            .client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    async fn close(&self, handle: MongoHandle) {
        handle.client.shutdown().await;
    }
}

/// Event store backed by a MongoDB collection
pub struct MongoEventStore {
    manager: ConnectionManager<MongoConnector>,
    collection: String,
    operation_timeout: Duration,
}

impl MongoEventStore {
    /// Create the store; the connection is opened on first use
    pub fn new(config: MongoConfig) -> Self {
        let collection = config.collection.clone();
        let operation_timeout = config.operation_timeout;
        let connect_timeout = config.connect_timeout;

        Self {
            manager: ConnectionManager::new(MongoConnector::new(config), connect_timeout),
            collection,
            operation_timeout,
        }
    }

    async fn events(&self) -> Result<Collection<EventDocument>, StoreError> {
        let handle = self.manager.acquire().await?;
        Ok(handle.database.collection::<EventDocument>(&self.collection))
    }

    async fn bounded<T, F>(&self, what: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: IntoFuture<Output = Result<T, mongodb::error::Error>>,
    {
        match tokio::time::timeout(self.operation_timeout, fut.into_future()).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!("{} exceeded {:?}", what, self.operation_timeout);
                Err(StoreError::Timeout(what, self.operation_timeout))
            }
        }
    }
}

#[async_trait]
impl EventStore for MongoEventStore {
    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let events = self.events().await?;

        let cursor = self
            .bounded("find events", events.find(doc! {}).sort(doc! { "created_at": -1 }))
            .await?;
        let documents: Vec<EventDocument> =
            self.bounded("read events", cursor.try_collect()).await?;

        debug!("Found {} events", documents.len());
        Ok(documents.into_iter().map(EventDocument::into_event).collect())
    }

    async fn insert_event(&self, record: EventRecord) -> Result<Event, StoreError> {
        let events = self.events().await?;
        let document = EventDocument::from_record(&record);

        let result = self.bounded("insert event", events.insert_one(&document)).await?;
        let id = match result.inserted_id.as_object_id() {
            Some(oid) => oid.to_hex(),
            None => result.inserted_id.to_string(),
        };

        info!("Event created with id {}", id);
        Ok(record.with_id(id))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.manager.acquire().await.map(|_| ())
    }

    async fn connection_state(&self) -> &'static str {
        self.manager.state_label().await
    }

    async fn close(&self) {
        self.manager.release().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use chrono::Utc;
    use isimm_common::EventDraft;

    #[tokio::test]
    async fn test_missing_uri_is_a_configuration_error() {
        let store = MongoEventStore::new(test_config(&[]).mongo);

        let err = store.list_events().await.unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
        assert_eq!(store.connection_state().await, "failed");
    }

    #[tokio::test]
    async fn test_malformed_uri_is_a_configuration_error() {
        let store = MongoEventStore::new(test_config(&[("MONGODB_URI", "postgres://nope")]).mongo);

        let err = store.ping().await.unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_operation_times_out() {
        let store = MongoEventStore::new(test_config(&[]).mongo);
        let started = tokio::time::Instant::now();

        let stalled = std::future::pending::<Result<(), mongodb::error::Error>>();
        let err = store.bounded("find events", stalled).await.unwrap_err();

        assert!(matches!(
            err,
            StoreError::Timeout("find events", limit) if limit == Duration::from_secs(45)
        ));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(45) && elapsed < Duration::from_secs(46));
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_timeout_is_configurable() {
        let config = test_config(&[("MONGODB_OPERATION_TIMEOUT_MS", "250")]);
        let store = MongoEventStore::new(config.mongo);

        let stalled = std::future::pending::<Result<(), mongodb::error::Error>>();
        let err = store.bounded("insert event", stalled).await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout("insert event", limit) if limit == Duration::from_millis(250)));

        let quick = async { Ok::<_, mongodb::error::Error>(7) };
        assert_eq!(store.bounded("insert event", quick).await.unwrap(), 7);
    }

    // Integration tests require a real database
    // Run with: MONGODB_URI=mongodb://... cargo test -p isimm-server -- --ignored

    #[tokio::test]
    #[ignore = "requires database"]
    async fn insert_then_list_newest_first() {
        let uri = std::env::var("MONGODB_URI").expect("MONGODB_URI required");
        let config = test_config(&[
            ("MONGODB_URI", uri.as_str()),
            ("MONGODB_COLLECTION", "events_it"),
        ]);
        let store = MongoEventStore::new(config.mongo);

        let draft = |title: &str| EventDraft {
            title: Some(title.to_string()),
            description: Some("integration".to_string()),
            date: Some("2025-03-01".to_string()),
            location: Some("Lab A".to_string()),
            ..Default::default()
        };

        let first = store
            .insert_event(draft("first").validate().unwrap().stamp(Utc::now()))
            .await
            .expect("insert failed");
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = store
            .insert_event(draft("second").validate().unwrap().stamp(Utc::now()))
            .await
            .expect("insert failed");

        let listed = store.list_events().await.expect("list failed");
        let pos = |id: &str| listed.iter().position(|e| e.id == id).expect("event listed");
        assert!(pos(&second.id) < pos(&first.id));

        store.close().await;
        assert_eq!(store.connection_state().await, "unconnected");
    }
}
