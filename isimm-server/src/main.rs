//! IEEE CS ISIMM site server - events API and contact relay
//!
//! Architecture:
//! - Axum HTTP server answers the site's `/events` and `/contact` calls
//! - Events live in a MongoDB collection behind a single shared connection
//!   that is opened lazily and re-checked before reuse
//! - Contact submissions are validated and relayed through the Resend API
//!
//! # Usage
//!
//! ```bash
//! # Against a MongoDB deployment
//! MONGODB_URI=mongodb://localhost:27017/ieee-cs-isimm cargo run --bin isimm-server
//!
//! # Without a database (events are kept in memory)
//! EVENT_STORE=memory cargo run --bin isimm-server
//! ```

mod config;
mod error;
mod mail;
mod models;
mod routes;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, StoreBackend};
use crate::mail::ResendMailer;
use crate::routes::AppState;
use crate::store::{EventStore, MemoryEventStore, MongoEventStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env();

    // Setup logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .init();
    }

    info!("Starting IEEE CS ISIMM server v{}", env!("CARGO_PKG_VERSION"));
    for notice in &config.warnings {
        warn!("{}", notice);
    }
    info!("Configuration: {:?}", config);

    // Event store; the MongoDB connection itself is opened on first use
    let store: Arc<dyn EventStore> = match config.store_backend {
        StoreBackend::MongoDb => {
            if config.mongo.uri.is_none() {
                bail!("MONGODB_URI is not defined in environment variables");
            }
            Arc::new(MongoEventStore::new(config.mongo.clone()))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory event store; events are lost on restart");
            Arc::new(MemoryEventStore::new())
        }
    };

    if config.contact.route().is_none() {
        warn!("Contact relay is not fully configured; /contact will answer 500");
    }

    let mailer = ResendMailer::new(config.contact.endpoint.clone())
        .context("failed to build HTTP client for email delivery")?;

    // Create app state
    let addr: SocketAddr = config.server_addr().parse()?;
    let state = AppState {
        store: store.clone(),
        mailer: Arc::new(mailer),
        config: Arc::new(config),
    };

    // Build router
    let app = routes::router(state)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    // Start server
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
