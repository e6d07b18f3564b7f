//! REST API client for the Batimap backend.
//!
//! Wraps the backend HTTP endpoints (city lookups, task listing, task status)
//! using [`reqwest`], and exposes the two long-running operations as task
//! status streams.

use async_trait::async_trait;
use batimap_core::city::{CityDTO, ConflateCityDTO, ObsoleteCityDTO};
use batimap_core::error::TaskError;
use batimap_core::notify::{report_failure, ErrorReporting, HttpFailure};
use batimap_core::task::{RawTaskStatus, Task, TaskDTO, TaskResult};
use batimap_core::types::TaskId;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use serde::de::DeserializeOwned;

use crate::poller::{wait_task, PollConfig, TaskStatusSource};

/// HTTP client for the Batimap backend.
#[derive(Debug, Clone)]
pub struct BatimapApi {
    client: reqwest::Client,
    base_url: String,
    poll: PollConfig,
    reporting: ErrorReporting,
}

/// Errors from the Batimap REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum BatimapApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Batimap API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl From<BatimapApiError> for TaskError {
    fn from(e: BatimapApiError) -> Self {
        match &e {
            BatimapApiError::Request(inner) if inner.is_decode() => {
                TaskError::Decode(e.to_string())
            }
            _ => TaskError::Api(e.to_string()),
        }
    }
}

impl BatimapApi {
    /// Create a new API client.
    ///
    /// * `base_url` - Backend root, e.g. `http://localhost:5000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            poll: PollConfig::default(),
            reporting: ErrorReporting::Notify,
        }
    }

    /// Override the task polling parameters.
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Override the error notification policy (defaults to `Notify`).
    pub fn with_reporting(mut self, reporting: ErrorReporting) -> Self {
        self.reporting = reporting;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn poll_config(&self) -> &PollConfig {
        &self.poll
    }

    // ---- plain endpoints ----

    /// Submit a long-running job. The endpoint answers `202 {"task_id"}`.
    pub async fn submit(&self, path: &str) -> Result<Task, BatimapApiError> {
        self.get_json(&self.url(path)).await
    }

    /// Fetch the current status of a task (`GET /tasks/<id>`).
    pub async fn task_status(&self, task_id: &TaskId) -> Result<RawTaskStatus, BatimapApiError> {
        self.get_json(&self.url(&format!("tasks/{task_id}"))).await
    }

    /// List active and reserved tasks (`GET /tasks`).
    pub async fn tasks(&self) -> Result<Vec<TaskDTO>, BatimapApiError> {
        self.get_json(&self.url("tasks")).await
    }

    /// List tasks queued for one city (`GET /cities/<insee>/tasks`).
    pub async fn city_tasks(&self, insee: &str) -> Result<Vec<TaskDTO>, BatimapApiError> {
        self.get_json(&self.url(&format!("cities/{insee}/tasks"))).await
    }

    /// Fetch a city summary (`GET /cities/<insee>`).
    pub async fn city(&self, insee: &str) -> Result<CityDTO, BatimapApiError> {
        self.get_json(&self.url(&format!("cities/{insee}"))).await
    }

    /// Find the city with the oldest import, skipping `ignored` departments.
    ///
    /// The backend answers 404 when nothing qualifies; that maps to `None`.
    pub async fn obsolete_city(
        &self,
        ignored: &[String],
    ) -> Result<Option<ObsoleteCityDTO>, BatimapApiError> {
        let url = self.url("cities/obsolete");
        let response = self
            .client
            .get(&url)
            .query(&[("ignored", ignored.join(","))])
            .send()
            .await
            .map_err(|e| self.fail(&url, e.into()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!("No obsolete city found");
            return Ok(None);
        }
        let city = self.parse_response(&url, response).await?;
        Ok(Some(city))
    }

    // ---- long-running jobs ----

    /// Prepare (or reuse) the JOSM data of a city.
    pub fn city_josm_data(
        &self,
        insee: &str,
    ) -> BoxStream<'_, Result<TaskResult<ConflateCityDTO>, TaskError>> {
        self.long_running(&format!("cities/{insee}/josm"))
    }

    /// Refresh the import statistics of a city.
    pub fn update_city(&self, insee: &str) -> BoxStream<'_, Result<TaskResult<CityDTO>, TaskError>> {
        self.long_running(&format!("cities/{insee}/update"))
    }

    /// Submit a job at `path`, then follow it with [`wait_task`].
    ///
    /// A failed submission is yielded as the single `Err` of the stream.
    pub fn long_running<T>(&self, path: &str) -> BoxStream<'_, Result<TaskResult<T>, TaskError>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let url = self.url(path);

        stream::once(async move { self.get_json::<Task>(&url).await })
            .map(move |submitted| match submitted {
                Ok(task) => {
                    tracing::info!(task_id = %task.task_id, "Backend task submitted");
                    wait_task::<Self, T>(self, task.task_id, &self.poll)
                }
                Err(e) => stream::iter([Err::<TaskResult<T>, _>(TaskError::from(e))]).boxed(),
            })
            .flatten()
            .boxed()
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, BatimapApiError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.fail(url, e.into()))?;
        self.parse_response(url, response).await
    }

    /// Check the status, then decode the JSON body.
    async fn parse_response<T: DeserializeOwned>(
        &self,
        url: &str,
        response: reqwest::Response,
    ) -> Result<T, BatimapApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(self.fail(
                url,
                BatimapApiError::ApiError {
                    status: status.as_u16(),
                    body,
                },
            ));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| self.fail(url, e.into()))
    }

    /// Raise the notification for a failed call and hand the error back.
    fn fail(&self, url: &str, error: BatimapApiError) -> BatimapApiError {
        let failure = match &error {
            BatimapApiError::Request(e) => {
                HttpFailure::new(e.status().map(|s| s.as_u16()), url, e.to_string())
            }
            BatimapApiError::ApiError { status, body } => {
                HttpFailure::new(Some(*status), url, body.clone())
            }
        };
        report_failure(self.reporting, &failure);
        error
    }
}

#[async_trait]
impl TaskStatusSource for BatimapApi {
    async fn task_status(&self, task_id: &TaskId) -> Result<RawTaskStatus, BatimapApiError> {
        BatimapApi::task_status(self, task_id).await
    }
}
