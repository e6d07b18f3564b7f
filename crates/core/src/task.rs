//! Backend job states, progress, and the status interpreter.
//!
//! The Batimap backend runs long operations as Celery tasks. Submitting one
//! returns a [`Task`] handle; `GET /tasks/<id>` then answers with a
//! [`RawTaskStatus`]. [`RawTaskStatus::interpret`] turns that wire shape into
//! the uniform [`TaskResult`] consumed by the poller and its callers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{TaskError, UNKNOWN_ERROR};
use crate::types::TaskId;

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Response body of a job submission (`202 {"task_id": "..."}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
}

/// One entry of the backend's active/reserved task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDTO {
    pub task_id: TaskId,
    /// Short task name, e.g. `task_josm_data`.
    pub name: String,
    /// Positional arguments the task was queued with (usually one INSEE code).
    #[serde(default)]
    pub args: Vec<Value>,
    /// `false` while the task is still reserved and waiting for a worker.
    #[serde(default)]
    pub running: bool,
}

// ---------------------------------------------------------------------------
// State and progress
// ---------------------------------------------------------------------------

/// Celery task state as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    Pending,
    Progress,
    Failure,
    Success,
}

impl TaskState {
    /// `SUCCESS` and `FAILURE` end a job; no transition follows them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

/// Percent-complete pair. `total` is conventionally 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgress {
    pub current: u32,
    pub total: u32,
}

impl TaskProgress {
    /// Progress reported while the job is still `PENDING`.
    pub const PENDING: Self = Self::new(0, 100);
    /// Progress attached to a `SUCCESS` result.
    pub const DONE: Self = Self::new(100, 100);

    pub const fn new(current: u32, total: u32) -> Self {
        Self { current, total }
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.current) * 100.0 / f64::from(self.total)
    }

    /// Parse the `{"current": .., "total": ..}` meta of a `PROGRESS` status.
    ///
    /// The backend rounds `current` to two decimals; fractions are truncated.
    fn from_payload(payload: &Value) -> Option<Self> {
        let current = payload.get("current").and_then(Value::as_f64)?;
        let total = payload.get("total").and_then(Value::as_f64)?;
        (current >= 0.0 && total >= 1.0).then(|| Self::new(current as u32, total as u32))
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Body of `GET /tasks/<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTaskStatus {
    pub state: TaskState,
    /// Progress meta, success value, or failure payload depending on `state`.
    #[serde(default)]
    pub result: Option<Value>,
}

/// Uniform progress/result event.
///
/// `progress` is unset only for a `PROGRESS` status whose meta cannot be
/// read; the poller fills in the last known value. `result` is set only for
/// a `SUCCESS` carrying a non-null value. Failures never appear here, they are [`TaskError`]s.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskResult<T> {
    pub state: TaskState,
    pub progress: Option<TaskProgress>,
    pub result: Option<T>,
}

impl<T> TaskResult<T> {
    fn in_flight(state: TaskState, progress: TaskProgress) -> Self {
        Self {
            state,
            progress: Some(progress),
            result: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Project the success value, keeping state and progress.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> TaskResult<U> {
        TaskResult {
            state: self.state,
            progress: self.progress,
            result: self.result.map(f),
        }
    }
}

impl RawTaskStatus {
    /// Translate a wire status into a [`TaskResult`], deserializing a
    /// `SUCCESS` value into `T`.
    ///
    /// `FAILURE` becomes [`TaskError::Failed`] carrying the backend message,
    /// or `"unknown error"` when the payload is empty.
    pub fn interpret<T: DeserializeOwned>(self) -> Result<TaskResult<T>, TaskError> {
        let payload = self.result.map(decode_nested);

        match self.state {
            TaskState::Pending => Ok(TaskResult::in_flight(
                TaskState::Pending,
                TaskProgress::PENDING,
            )),
            TaskState::Progress => {
                let progress = payload.as_ref().and_then(TaskProgress::from_payload);
                if progress.is_none() {
                    tracing::warn!(?payload, "Unreadable PROGRESS payload");
                }
                Ok(TaskResult {
                    state: TaskState::Progress,
                    progress,
                    result: None,
                })
            }
            TaskState::Success => {
                let result = match payload {
                    None | Some(Value::Null) => None,
                    Some(value) => Some(serde_json::from_value(value).map_err(|e| {
                        TaskError::Decode(format!("unexpected SUCCESS payload: {e}"))
                    })?),
                };
                Ok(TaskResult {
                    state: TaskState::Success,
                    progress: Some(TaskProgress::DONE),
                    result,
                })
            }
            TaskState::Failure => Err(TaskError::Failed(failure_message(payload))),
        }
    }
}

/// Celery stores results as `json.dumps(..)`; undo one level of encoding
/// when a string holds a JSON object or array.
fn decode_nested(value: Value) -> Value {
    match value {
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(decoded @ (Value::Object(_) | Value::Array(_))) => decoded,
            _ => Value::String(text),
        },
        other => other,
    }
}

fn failure_message(payload: Option<Value>) -> String {
    match payload {
        None | Some(Value::Null) => UNKNOWN_ERROR.to_string(),
        Some(Value::String(text)) if text.trim().is_empty() => UNKNOWN_ERROR.to_string(),
        Some(Value::String(text)) => text,
        Some(Value::Array(items)) if items.is_empty() => UNKNOWN_ERROR.to_string(),
        Some(Value::Object(map)) if map.is_empty() => UNKNOWN_ERROR.to_string(),
        Some(Value::Object(map)) => {
            if let Some(message) = map
                .get("error")
                .and_then(Value::as_str)
                .filter(|m| !m.trim().is_empty())
            {
                return message.to_string();
            }
            Value::Object(map).to_string()
        }
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn status(value: Value) -> RawTaskStatus {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn state_round_trips_upper_case_names() {
        let state: TaskState = serde_json::from_str("\"PROGRESS\"").unwrap();
        assert_eq!(state, TaskState::Progress);
        assert_eq!(serde_json::to_string(&TaskState::Success).unwrap(), "\"SUCCESS\"");
    }

    #[test]
    fn unknown_state_is_rejected() {
        let parsed = serde_json::from_value::<RawTaskStatus>(json!({"state": "REVOKED"}));
        assert!(parsed.is_err());
    }

    #[test]
    fn only_success_and_failure_are_terminal() {
        assert!(!TaskState::Pending.is_terminal());
        assert!(!TaskState::Progress.is_terminal());
        assert!(TaskState::Success.is_terminal());
        assert!(TaskState::Failure.is_terminal());
    }

    #[test]
    fn pending_synthesizes_zero_progress() {
        let r = status(json!({"state": "PENDING", "result": null}))
            .interpret::<Value>()
            .unwrap();
        assert_eq!(r.progress, Some(TaskProgress::new(0, 100)));
        assert!(r.result.is_none());
    }

    #[test]
    fn progress_reads_backend_meta() {
        let r = status(json!({"state": "PROGRESS", "result": {"current": 30, "total": 100}}))
            .interpret::<Value>()
            .unwrap();
        assert_eq!(r.state, TaskState::Progress);
        assert_eq!(r.progress, Some(TaskProgress::new(30, 100)));
        assert!(r.result.is_none());
    }

    #[test]
    fn progress_accepts_encoded_meta_and_fractions() {
        let r = status(json!({
            "state": "PROGRESS",
            "result": "{\"current\": 42.57, \"total\": 100}"
        }))
        .interpret::<Value>()
        .unwrap();
        assert_eq!(r.progress, Some(TaskProgress::new(42, 100)));
    }

    #[test]
    fn unreadable_progress_meta_leaves_progress_unknown() {
        for result in [json!(null), json!({"current": 3, "total": 0}), json!("soon")] {
            let r = status(json!({"state": "PROGRESS", "result": result}))
                .interpret::<Value>()
                .unwrap();
            assert_eq!(r.state, TaskState::Progress);
            assert_eq!(r.progress, None);
            assert!(!r.is_terminal());
        }
    }

    #[test]
    fn null_success_has_no_result() {
        let r = status(json!({"state": "SUCCESS", "result": null}))
            .interpret::<TaskDTO>()
            .unwrap();
        assert_eq!(r.state, TaskState::Success);
        assert_eq!(r.progress, Some(TaskProgress::DONE));
        assert_eq!(r.result, None);
    }

    #[test]
    fn success_projects_typed_result() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Done {
            insee: String,
        }

        let r = status(json!({"state": "SUCCESS", "result": {"insee": "29190"}}))
            .interpret::<Done>()
            .unwrap();
        assert_eq!(r.progress, Some(TaskProgress::DONE));
        assert_eq!(r.result, Some(Done { insee: "29190".into() }));
    }

    #[test]
    fn success_with_wrong_shape_is_a_decode_error() {
        let err = status(json!({"state": "SUCCESS", "result": [1, 2]}))
            .interpret::<TaskDTO>()
            .unwrap_err();
        assert_matches!(err, TaskError::Decode(_));
    }

    #[test]
    fn failure_carries_backend_message() {
        let err = status(json!({"state": "FAILURE", "result": "disk full"}))
            .interpret::<Value>()
            .unwrap_err();
        assert_eq!(err, TaskError::Failed("disk full".into()));
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn failure_reads_error_field() {
        let err = status(json!({"state": "FAILURE", "result": {"error": "Task failed: boom"}}))
            .interpret::<Value>()
            .unwrap_err();
        assert_eq!(err, TaskError::Failed("Task failed: boom".into()));
    }

    #[test]
    fn empty_failure_falls_back_to_unknown_error() {
        for payload in [json!(null), json!(""), json!({}), json!([])] {
            let err = status(json!({"state": "FAILURE", "result": payload}))
                .interpret::<Value>()
                .unwrap_err();
            assert_eq!(err.to_string(), "unknown error");
        }
        let err = status(json!({"state": "FAILURE"}))
            .interpret::<Value>()
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown error");
    }

    #[test]
    fn map_keeps_state_and_progress() {
        let r = status(json!({"state": "SUCCESS", "result": 7}))
            .interpret::<u32>()
            .unwrap()
            .map(|n| n * 2);
        assert_eq!(r.result, Some(14));
        assert!(r.is_terminal());
    }

    #[test]
    fn percent_handles_non_hundred_totals() {
        assert_eq!(TaskProgress::new(1, 4).percent(), 25.0);
        assert_eq!(TaskProgress::new(0, 0).percent(), 0.0);
    }

    #[test]
    fn task_dto_parses_backend_listing() {
        let dto: TaskDTO = serde_json::from_value(json!({
            "task_id": "6f1c1e0a-4a8b-4a53-9b59-0f3b6f6a4f10",
            "name": "task_josm_data",
            "args": ["29190"],
            "running": true
        }))
        .unwrap();
        assert_eq!(dto.name, "task_josm_data");
        assert_eq!(dto.args, vec![json!("29190")]);
        assert!(dto.running);
    }
}
