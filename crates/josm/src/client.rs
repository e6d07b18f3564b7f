//! HTTP client for the JOSM remote-control port.

use batimap_core::notify::{report_failure, ErrorReporting, HttpFailure};

use crate::steps::ImportStep;

/// Default origin of the remote-control listener.
pub const DEFAULT_JOSM_URL: &str = "http://127.0.0.1:8111";

/// Errors from a remote-control call.
#[derive(Debug, thiserror::Error)]
pub enum JosmError {
    /// No response at all: JOSM is closed or remote control is disabled.
    #[error("JOSM {step} request failed: {source}")]
    Request {
        step: &'static str,
        source: reqwest::Error,
    },

    /// JOSM answered with a non-2xx status.
    #[error("JOSM {step} returned {status}: {body}")]
    Status {
        step: &'static str,
        status: u16,
        body: String,
    },

    /// A URL built for a call could not be parsed.
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl JosmError {
    /// HTTP status, when JOSM answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            JosmError::Status { status, .. } => Some(*status),
            JosmError::Request { source, .. } => source.status().map(|s| s.as_u16()),
            JosmError::InvalidUrl { .. } => None,
        }
    }

    /// JOSM reports a bbox download exceeding the API limits as 502.
    pub fn is_payload_too_large(&self) -> bool {
        self.status() == Some(502)
    }

    /// Endpoint of the failed call.
    pub fn step(&self) -> Option<&'static str> {
        match self {
            JosmError::Request { step, .. } | JosmError::Status { step, .. } => Some(step),
            JosmError::InvalidUrl { .. } => None,
        }
    }
}

/// Sends [`ImportStep`]s to a running JOSM.
#[derive(Debug, Clone)]
pub struct JosmClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for JosmClient {
    fn default() -> Self {
        Self::new(DEFAULT_JOSM_URL)
    }
}

impl JosmClient {
    /// Create a client for the listener at `base_url`, e.g. `http://127.0.0.1:8111`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Listener origin, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query `GET /version`. Returns the raw JSON body.
    pub async fn version(&self, reporting: ErrorReporting) -> Result<String, JosmError> {
        let url = format!("{}/version", self.base_url);
        let response = self.client.get(&url).send().await.map_err(|source| {
            let error = JosmError::Request {
                step: "version",
                source,
            };
            self.fail(reporting, &url, error)
        })?;
        let response = self.ensure_success(reporting, &url, "version", response).await?;
        response.text().await.map_err(|source| JosmError::Request {
            step: "version",
            source,
        })
    }

    /// Whether JOSM is running with remote control enabled.
    pub async fn is_started(&self) -> bool {
        match self.version(ErrorReporting::Bypass).await {
            Ok(version) => {
                tracing::debug!(%version, "JOSM is running");
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "JOSM is not reachable");
                false
            }
        }
    }

    /// Whether `url` answers a HEAD request with a 2xx status.
    pub async fn exists(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(url, status = response.status().as_u16(), "File not found");
                false
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "File existence check failed");
                false
            }
        }
    }

    /// Send one remote-control call. The response body is discarded.
    pub async fn execute(
        &self,
        step: &ImportStep,
        reporting: ErrorReporting,
    ) -> Result<(), JosmError> {
        let endpoint = step.endpoint();
        let url = format!("{}/{endpoint}", self.base_url);
        tracing::debug!(step = endpoint, "Sending JOSM remote-control call");

        let response = self
            .client
            .get(&url)
            .query(&step.query())
            .send()
            .await
            .map_err(|source| {
                let error = JosmError::Request {
                    step: endpoint,
                    source,
                };
                self.fail(reporting, &url, error)
            })?;
        self.ensure_success(reporting, &url, endpoint, response)
            .await?;
        Ok(())
    }

    // ---- private helpers ----

    async fn ensure_success(
        &self,
        reporting: ErrorReporting,
        url: &str,
        step: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, JosmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        let error = JosmError::Status {
            step,
            status: status.as_u16(),
            body,
        };
        Err(self.fail(reporting, url, error))
    }

    fn fail(&self, reporting: ErrorReporting, url: &str, error: JosmError) -> JosmError {
        let detail = match &error {
            JosmError::Status { body, .. } => body.clone(),
            other => other.to_string(),
        };
        report_failure(reporting, &HttpFailure::new(error.status(), url, detail));
        error
    }
}
