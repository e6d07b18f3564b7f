//! Task poller: follows a backend job until it reaches a terminal state.
//!
//! [`wait_task`] issues a status request immediately, then one more per
//! [`PollConfig::interval`]. The interval starts once the previous response
//! has settled, so requests never overlap. The terminal status is always
//! yielded before the stream ends, and nothing is requested after it.
//!
//! Dropping the stream cancels polling: the pending sleep or request is
//! dropped with it and no further tick is scheduled.

use std::time::Duration;

use async_trait::async_trait;
use batimap_core::error::TaskError;
use batimap_core::task::{RawTaskStatus, TaskDTO, TaskProgress, TaskResult};
use batimap_core::types::TaskId;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::BatimapApiError;

/// Interval between two status requests.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Anything that can answer "what is the status of this task?".
#[async_trait]
pub trait TaskStatusSource: Send + Sync {
    async fn task_status(&self, task_id: &TaskId) -> Result<RawTaskStatus, BatimapApiError>;
}

/// Tunable parameters of the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between a settled response and the next request.
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Poller state between two yielded events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollState {
    /// `last` is the most recent readable progress.
    Polling { tick: u64, last: TaskProgress },
    Terminal,
}

/// Follow `task_id` until `SUCCESS` or `FAILURE`.
///
/// Yields one event per tick. `SUCCESS` is the last `Ok` item; `FAILURE`
/// and request errors are yielded as a single `Err` that ends the stream.
/// The success value is deserialized into `T` (use [`Value`] to keep it raw).
/// A `PROGRESS` status with unreadable meta repeats the last known progress
/// and polling goes on.
pub fn wait_task<'a, S, T>(
    source: &'a S,
    task_id: TaskId,
    config: &PollConfig,
) -> BoxStream<'a, Result<TaskResult<T>, TaskError>>
where
    S: TaskStatusSource + ?Sized,
    T: DeserializeOwned + Send + 'a,
{
    let interval = config.interval;

    let start = PollState::Polling {
        tick: 0,
        last: TaskProgress::PENDING,
    };

    stream::unfold(start, move |state| async move {
        let (tick, last) = match state {
            PollState::Terminal => return None,
            PollState::Polling { tick, last } => (tick, last),
        };

        if tick > 0 {
            tokio::time::sleep(interval).await;
        }

        let mut event = poll_once::<S, T>(source, &task_id, tick).await;
        let next = match &mut event {
            Ok(status) if !status.is_terminal() => PollState::Polling {
                tick: tick + 1,
                last: *status.progress.get_or_insert(last),
            },
            _ => PollState::Terminal,
        };
        Some((event, next))
    })
    .boxed()
}

/// Follow several tasks at once, tagging every event with its task.
///
/// Each task gets its own independent poller; the merged stream ends once
/// all of them have reached a terminal state.
pub fn watch_tasks<'a, S>(
    source: &'a S,
    tasks: Vec<TaskDTO>,
    config: &PollConfig,
) -> BoxStream<'a, (TaskDTO, Result<TaskResult<Value>, TaskError>)>
where
    S: TaskStatusSource + ?Sized,
{
    let pollers = tasks.into_iter().map(|task| {
        wait_task::<S, Value>(source, task.task_id, config)
            .map(move |event| (task.clone(), event))
            .boxed()
    });
    stream::select_all(pollers).boxed()
}

async fn poll_once<S, T>(
    source: &S,
    task_id: &TaskId,
    tick: u64,
) -> Result<TaskResult<T>, TaskError>
where
    S: TaskStatusSource + ?Sized,
    T: DeserializeOwned,
{
    let raw = source.task_status(task_id).await.map_err(|e| {
        tracing::warn!(%task_id, tick, error = %e, "Task status request failed");
        TaskError::from(e)
    })?;

    tracing::debug!(%task_id, tick, state = ?raw.state, "Task status");

    let result = raw.interpret::<T>();
    match &result {
        Ok(status) if status.is_terminal() => {
            tracing::info!(%task_id, tick, "Task succeeded");
        }
        Err(e) => {
            tracing::warn!(%task_id, tick, error = %e, "Task ended with an error");
        }
        Ok(_) => {}
    }
    result
}
