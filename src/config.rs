use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the URLive API, e.g. "http://15.164.73.228:8080".
    /// Must NOT have a trailing slash.
    pub api_base_url: String,

    /// Base used to build absolute short links shown on the dashboard.
    /// Defaults to `api_base_url`, since the API also serves the redirects.
    pub short_link_base_url: String,

    /// Host to bind the front server to, e.g. "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// How long a notification stays visible
    pub notification_duration: Duration,

    /// How many idle hours a browser client keeps its state
    pub client_idle_hours: u64,

    /// Most browser clients kept live at once; the least recently seen is
    /// dropped to make room.
    pub max_clients: usize,

    /// When set, each client store is persisted as a JSON file here.
    pub storage_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        let api_base_url = std::env::var("API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".into())
            .trim_end_matches('/')
            .to_owned();

        if api_base_url.is_empty() {
            anyhow::bail!("API_BASE_URL must not be empty");
        }

        url::Url::parse(&api_base_url)
            .with_context(|| format!("API_BASE_URL is not a valid URL: {api_base_url}"))?;

        let short_link_base_url = std::env::var("SHORT_LINK_BASE_URL")
            .map(|v| v.trim_end_matches('/').to_owned())
            .unwrap_or_else(|_| api_base_url.clone());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse::<u16>()
            .context("PORT must be a valid port number (1–65535)")?;

        let notification_ms = std::env::var("NOTIFICATION_MS")
            .unwrap_or_else(|_| "3000".into())
            .parse::<u64>()
            .unwrap_or(3000);

        let client_idle_hours = std::env::var("CLIENT_IDLE_HOURS")
            .unwrap_or_else(|_| "24".into())
            .parse::<u64>()
            .unwrap_or(24);

        let max_clients = std::env::var("MAX_CLIENTS")
            .unwrap_or_else(|_| "10000".into())
            .parse::<usize>()
            .context("MAX_CLIENTS must be a positive number")?;

        if max_clients == 0 {
            anyhow::bail!("MAX_CLIENTS must be at least 1");
        }

        let storage_dir = std::env::var("STORAGE_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            api_base_url,
            short_link_base_url,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            notification_duration: Duration::from_millis(notification_ms),
            client_idle_hours,
            max_clients,
            storage_dir,
        })
    }

    /// Configuration pointing at a specific API, with defaults for everything else.
    pub fn for_api(api_base_url: impl Into<String>) -> Self {
        let api_base_url = api_base_url.into().trim_end_matches('/').to_owned();
        Self {
            short_link_base_url: api_base_url.clone(),
            api_base_url,
            host: "127.0.0.1".into(),
            port: 3000,
            notification_duration: Duration::from_millis(3000),
            client_idle_hours: 24,
            max_clients: 10_000,
            storage_dir: None,
        }
    }
}
