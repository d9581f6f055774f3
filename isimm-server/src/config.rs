//! Configuration for the site server.
//!
//! All configuration is read from environment variables (a `.env` file is
//! loaded first when present).

use std::cell::RefCell;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// Which event store backs `/events`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MongoDb,
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::MongoDb => "mongodb",
            StoreBackend::Memory => "memory",
        }
    }
}

/// MongoDB connection settings
#[derive(Clone)]
pub struct MongoConfig {
    /// Connection string
    pub uri: Option<String>,

    /// Database name, overriding the one named in the URI
    pub database: Option<String>,

    /// Collection holding event documents
    pub collection: String,

    pub max_pool_size: u32,
    pub server_selection_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_idle_time: Duration,

    /// Upper bound on a single query or insert
    pub operation_timeout: Duration,
}

/// Contact relay settings
#[derive(Clone)]
pub struct ContactConfig {
    /// Resend API key
    pub api_key: Option<String>,

    /// Resend send-email endpoint
    pub endpoint: String,

    /// Sender address
    pub from: Option<String>,

    /// Recipient addresses
    pub to: Vec<String>,

    /// Prepended to the submitted subject
    pub subject_prefix: String,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub host: String,

    /// HTTP server port
    pub port: u16,

    pub environment: Environment,

    pub store_backend: StoreBackend,

    pub mongo: MongoConfig,

    pub contact: ContactConfig,

    /// Log level
    pub log_level: String,

    /// Enable JSON logging
    pub log_json: bool,

    /// Values that were rejected in favour of a default; logged once tracing is up
    pub warnings: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // empty values count as unset
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let warnings = RefCell::new(Vec::new());
        let millis = |key: &str, default: u64| {
            Duration::from_millis(parse_or(&var, &warnings, key, default))
        };

        let environment = match var("APP_ENV").as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            _ => Environment::Development,
        };

        let store_backend = match var("EVENT_STORE").as_deref() {
            Some("memory") => StoreBackend::Memory,
            Some("mongodb") | None => StoreBackend::MongoDb,
            Some(other) => {
                warnings
                    .borrow_mut()
                    .push(format!("Unknown EVENT_STORE {:?}, using mongodb", other));
                StoreBackend::MongoDb
            }
        };

        let port = parse_or(&var, &warnings, "PORT", 8080u16);
        let max_pool_size = parse_or(&var, &warnings, "MONGODB_MAX_POOL_SIZE", 10u32);

        Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            environment,
            store_backend,
            mongo: MongoConfig {
                uri: var("MONGODB_URI"),
                database: var("MONGODB_DATABASE"),
                collection: var("MONGODB_COLLECTION").unwrap_or_else(|| "events".to_string()),
                max_pool_size,
                server_selection_timeout: millis("MONGODB_SERVER_SELECTION_TIMEOUT_MS", 10_000),
                connect_timeout: millis("MONGODB_CONNECT_TIMEOUT_MS", 10_000),
                max_idle_time: millis("MONGODB_MAX_IDLE_TIME_MS", 30_000),
                operation_timeout: millis("MONGODB_OPERATION_TIMEOUT_MS", 45_000),
            },
            contact: ContactConfig {
                api_key: var("RESEND_API_KEY"),
                endpoint: var("RESEND_ENDPOINT")
                    .unwrap_or_else(|| "https://api.resend.com/emails".to_string()),
                from: var("CONTACT_EMAIL_FROM"),
                to: var("CONTACT_EMAIL_TO")
                    .map(|list| split_recipients(&list))
                    .unwrap_or_default(),
                subject_prefix: lookup("CONTACT_SUBJECT_PREFIX")
                    .unwrap_or_else(|| "[CS ISIMM Contact]".to_string()),
            },
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json: var("LOG_JSON")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            warnings: warnings.into_inner(),
        }
    }

    /// Get the full server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_or<T, F>(var: &F, warnings: &RefCell<Vec<String>>, key: &str, default: T) -> T
where
    T: FromStr + fmt::Display,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warnings.borrow_mut().push(format!(
                "Invalid {} value {:?} ({}), using default {}",
                key, raw, e, default
            ));
            default
        }),
        None => default,
    }
}

/// Split a comma-separated recipient list, trimming entries and dropping empties
pub fn split_recipients(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolved delivery settings for one submission
#[derive(Debug, Clone, Copy)]
pub struct MailRoute<'a> {
    pub api_key: &'a str,
    pub from: &'a str,
    pub to: &'a [String],
}

impl ContactConfig {
    /// Delivery settings, if the relay is fully configured
    pub fn route(&self) -> Option<MailRoute<'_>> {
        match (self.api_key.as_deref(), self.from.as_deref()) {
            (Some(api_key), Some(from)) if !self.to.is_empty() => Some(MailRoute {
                api_key,
                from,
                to: &self.to,
            }),
            _ => None,
        }
    }
}

// Secrets never reach the logs

impl fmt::Debug for MongoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoConfig")
            .field("uri", &self.uri.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("max_pool_size", &self.max_pool_size)
            .field("server_selection_timeout", &self.server_selection_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("max_idle_time", &self.max_idle_time)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

impl fmt::Debug for ContactConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContactConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("subject_prefix", &self.subject_prefix)
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn test_config(pairs: &[(&str, &str)]) -> Config {
    let vars: std::collections::HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| vars.get(key).cloned())
}
