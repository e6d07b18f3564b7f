use std::time::Duration;

use batimap_backend::{BatimapApi, PollConfig};
use batimap_core::artifact::{ImagerySource, BDORTHO_TITLE, BDORTHO_URL};
use batimap_josm::{JosmClient, JosmImporter, DEFAULT_JOSM_URL, DEFAULT_OVERPASS_URL};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

/// Invalid configuration value.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Client configuration loaded from environment variables.
///
/// All fields default to the public Batimap deployment layout with a local
/// backend and JOSM on its standard remote-control port.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Backend root (default: `http://localhost:5000`).
    pub backend_url: String,
    /// JOSM remote-control origin (default: `http://127.0.0.1:8111`).
    pub josm_url: String,
    /// Delay between two task status requests (default: 3 s).
    pub poll_interval: Duration,
    /// Per-request HTTP timeout (default: 30 s).
    pub request_timeout: Duration,
    pub overpass_url: String,
    pub imagery: ImagerySource,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                                   |
    /// |-------------------------|-------------------------------------------|
    /// | `BATIMAP_BACKEND_URL`   | `http://localhost:5000`                   |
    /// | `JOSM_URL`              | `http://127.0.0.1:8111`                   |
    /// | `TASK_POLL_INTERVAL_MS` | `3000`                                    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                                      |
    /// | `OVERPASS_URL`          | `https://overpass-api.de/api/interpreter` |
    /// | `IMAGERY_TITLE`         | `BDOrtho IGN`                             |
    /// | `IMAGERY_URL`           | IGN BDOrtho proxy TMS template            |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let string = |var: &str, default: &str| lookup(var).unwrap_or_else(|| default.to_string());

        let poll_interval_ms = positive(&lookup, "TASK_POLL_INTERVAL_MS", 3000)?;
        let request_timeout_secs = positive(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;

        Ok(Self {
            backend_url: string("BATIMAP_BACKEND_URL", DEFAULT_BACKEND_URL),
            josm_url: string("JOSM_URL", DEFAULT_JOSM_URL),
            poll_interval: Duration::from_millis(poll_interval_ms),
            request_timeout: Duration::from_secs(request_timeout_secs),
            overpass_url: string("OVERPASS_URL", DEFAULT_OVERPASS_URL),
            imagery: ImagerySource {
                title: string("IMAGERY_TITLE", BDORTHO_TITLE),
                url: string("IMAGERY_URL", BDORTHO_URL),
            },
        })
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: self.poll_interval,
        }
    }

    /// Backend client sharing `client`.
    pub fn backend(&self, client: reqwest::Client) -> BatimapApi {
        BatimapApi::with_client(client, &self.backend_url).with_poll_config(self.poll_config())
    }

    pub fn importer(&self, client: reqwest::Client) -> JosmImporter {
        JosmImporter::new(JosmClient::with_client(client, &self.josm_url))
            .with_overpass_url(&self.overpass_url)
    }

    /// HTTP client honoring the configured timeout.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
    }
}

fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value) = lookup(var) else {
        return Ok(default);
    };
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid { var, value }),
    }
}
