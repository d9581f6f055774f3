//! HTTP route handlers.

pub mod contact;
pub mod diagnostics;
pub mod events;
pub mod health;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::config::Config;
use crate::mail::Mailer;
use crate::store::EventStore;

pub use contact::send_contact;
pub use diagnostics::config_report;
pub use events::{create_event, list_events};
pub use health::{health, ready};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        // Health checks
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Events
        .route("/events", get(list_events).post(create_event))
        // Contact relay
        .route("/contact", post(send_contact));

    if !state.config.is_production() {
        app = app.route("/diagnostics/config", get(config_report));
    }

    app.with_state(state)
}
