//! Configuration report for operators. Mounted outside production only.
//!
//! Reports which settings are present without revealing their values.

use axum::{extract::State, Json};
use serde::Serialize;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct ConfigReport {
    pub environment: &'static str,
    pub store_backend: &'static str,
    pub store_state: &'static str,
    pub has_mongodb_uri: bool,
    pub mongodb_uri_scheme: Option<&'static str>,
    pub has_retry_writes: bool,
    pub has_majority_write_concern: bool,
    pub has_resend_api_key: bool,
    pub has_contact_from: bool,
    pub contact_recipients: usize,
}

/// GET /diagnostics/config
pub async fn config_report(State(state): State<AppState>) -> Json<ConfigReport> {
    let config = &state.config;
    let uri = config.mongo.uri.as_deref().unwrap_or("");

    let scheme = if uri.starts_with("mongodb+srv://") {
        Some("mongodb+srv")
    } else if uri.starts_with("mongodb://") {
        Some("mongodb")
    } else {
        None
    };

    Json(ConfigReport {
        environment: config.environment.as_str(),
        store_backend: config.store_backend.as_str(),
        store_state: state.store.connection_state().await,
        has_mongodb_uri: config.mongo.uri.is_some(),
        mongodb_uri_scheme: scheme,
        has_retry_writes: uri.contains("retryWrites=true"),
        has_majority_write_concern: uri.contains("w=majority"),
        has_resend_api_key: config.contact.api_key.is_some(),
        has_contact_from: config.contact.from.is_some(),
        contact_recipients: config.contact.to.len(),
    })
}
