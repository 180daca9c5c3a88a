use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Url;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 10000;
const DEFAULT_LOG_FILE: &str = "log.html";
const DEFAULT_MONGODB_DATABASE: &str = "geoalert";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_MAX_POLLS: u32 = 120;

/// Where captured reports are written.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    File { path: PathBuf },
    Sql { database_url: String },
    MongoDb { uri: String, database: String },
}

/// Mail settings. Every field may be absent at startup; the gaps surface as
/// delivery failures on each request instead of stopping the server.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailConfig {
    pub connection_string: Option<String>,
    pub sender_address: Option<String>,
    pub recipients: Vec<String>,
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            sender_address: None,
            recipients: Vec::new(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_polls: DEFAULT_MAX_POLLS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_address: String,
    pub port: u16,
    pub store: StoreBackend,
    pub email: EmailConfig,
    /// Empty means any origin is allowed
    pub cors_allowed_origins: Vec<String>,
    pub trust_proxy_headers: bool,
    pub expose_error_details: bool,
}

impl AppConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = match var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT is not a valid port number: {}", raw))?,
            None => DEFAULT_PORT,
        };

        let backend = var("STORE_BACKEND").unwrap_or_else(|| "file".to_string());
        let store = match backend.to_ascii_lowercase().as_str() {
            "file" => StoreBackend::File {
                path: PathBuf::from(var("LOG_FILE_PATH").unwrap_or_else(|| DEFAULT_LOG_FILE.into())),
            },
            "sql" => StoreBackend::Sql {
                database_url: var("DATABASE_URL")
                    .context("DATABASE_URL must be set when STORE_BACKEND=sql")?,
            },
            "mongodb" => StoreBackend::MongoDb {
                uri: var("MONGODB_URI")
                    .context("MONGODB_URI must be set when STORE_BACKEND=mongodb")?,
                database: var("MONGODB_DATABASE")
                    .unwrap_or_else(|| DEFAULT_MONGODB_DATABASE.into()),
            },
            other => bail!("Unknown STORE_BACKEND '{}', expected file, sql or mongodb", other),
        };

        let poll_interval_ms = match var("EMAIL_POLL_INTERVAL_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("EMAIL_POLL_INTERVAL_MS is not a number: {}", raw))?,
            None => DEFAULT_POLL_INTERVAL_MS,
        };
        let max_polls = match var("EMAIL_MAX_POLLS") {
            Some(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("EMAIL_MAX_POLLS is not a number: {}", raw))?,
            None => DEFAULT_MAX_POLLS,
        };

        let email = EmailConfig {
            connection_string: var("CONNECTION_STRING"),
            sender_address: var("SENDER_ADDRESS"),
            recipients: var("RECIPIENT_ADDRESS")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            poll_interval: Duration::from_millis(poll_interval_ms),
            max_polls,
        };

        Ok(Self {
            bind_address: var("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.into()),
            port,
            store,
            email,
            cors_allowed_origins: parse_origins(var("CORS_ALLOWED_ORIGINS"))?,
            trust_proxy_headers: parse_flag("TRUST_PROXY_HEADERS", var("TRUST_PROXY_HEADERS"), false)?,
            expose_error_details: parse_flag(
                "EXPOSE_ERROR_DETAILS",
                var("EXPOSE_ERROR_DETAILS"),
                true,
            )?,
        })
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(String::from)
        .collect()
}

/// Origins must be exact `scheme://host[:port]` values; a `*` entry allows
/// any origin.
fn parse_origins(raw: Option<String>) -> Result<Vec<String>> {
    let entries = raw.map(|raw| split_list(&raw)).unwrap_or_default();
    if entries.iter().any(|entry| entry == "*") {
        return Ok(Vec::new());
    }

    for entry in &entries {
        let url = Url::parse(entry)
            .with_context(|| format!("CORS_ALLOWED_ORIGINS entry is not a URL: {}", entry))?;
        let origin = url.origin().ascii_serialization();
        if !matches!(url.scheme(), "http" | "https") || origin != *entry {
            bail!(
                "CORS_ALLOWED_ORIGINS entry '{}' is not an origin, expected something like '{}'",
                entry,
                origin
            );
        }
    }
    Ok(entries)
}

fn parse_flag(key: &str, value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => bail!("{} must be true or false, got '{}'", key, other),
    }
}
