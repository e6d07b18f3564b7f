//! Per-call error notification policy.
//!
//! Failed HTTP calls normally raise one user-facing notice. Callers that
//! handle their own failures (every JOSM call made during an import) pass
//! [`ErrorReporting::Bypass`]. Either way the error still reaches the caller.

/// Origin of the JOSM remote-control listener.
pub const EDITOR_HOST: &str = "127.0.0.1:8111";

/// Tracing target of user-facing notifications.
pub const NOTIFY_TARGET: &str = "batimap::notify";

/// Whether a failing call raises a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorReporting {
    #[default]
    Notify,
    Bypass,
}

/// Description of a failed HTTP call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    /// `None` when no response was received (connection refused, DNS, CORS).
    pub status: Option<u16>,
    pub url: String,
    pub detail: String,
}

impl HttpFailure {
    pub fn new(status: Option<u16>, url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status,
            url: url.into(),
            detail: detail.into(),
        }
    }

    /// Message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self.status {
            None if host_of(&self.url) == EDITOR_HOST => {
                "JOSM is unreachable. Is it still running?".to_string()
            }
            None => "Unable to reach the server.".to_string(),
            Some(status) => format!(
                "A server error ({status}) occurred: {}. Please try again later.",
                self.detail
            ),
        }
    }
}

/// Raise the user-facing notification for `failure` unless bypassed.
pub fn report_failure(reporting: ErrorReporting, failure: &HttpFailure) {
    match reporting {
        ErrorReporting::Notify => {
            tracing::error!(
                target: NOTIFY_TARGET,
                url = %failure.url,
                status = ?failure.status,
                "{}",
                failure.user_message(),
            );
        }
        ErrorReporting::Bypass => {
            tracing::debug!(
                url = %failure.url,
                status = ?failure.status,
                detail = %failure.detail,
                "HTTP failure left to the caller",
            );
        }
    }
}

fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.split(['/', '?', '#']).next().unwrap_or(rest)
}
