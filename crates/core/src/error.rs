/// Fallback message for a `FAILURE` status whose payload carries nothing.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Errors surfaced on a task status stream.
///
/// A job that reached `FAILURE` and a poller that could not reach the
/// backend travel on the same channel; callers tell them apart by variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// The backend job ended in `FAILURE`. Displays the backend message as-is.
    #[error("{0}")]
    Failed(String),

    /// The status payload did not match the expected shape.
    #[error("Malformed task status: {0}")]
    Decode(String),

    /// The status request itself failed (network, HTTP status).
    #[error("Task status request failed: {0}")]
    Api(String),
}
