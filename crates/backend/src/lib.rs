//! Batimap backend REST client and task poller.
//!
//! [`BatimapApi`] wraps the backend HTTP endpoints. Long-running operations
//! (JOSM data preparation, city updates) return a task handle that
//! [`poller::wait_task`] follows until the job reaches a terminal state.

pub mod api;
pub mod poller;

pub use api::{BatimapApi, BatimapApiError};
pub use poller::{wait_task, watch_tasks, PollConfig, TaskStatusSource};
