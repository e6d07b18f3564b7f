//! Shared data model for Batimap task tracking and JOSM imports.
//!
//! - [`task`]: backend job states, progress and the status interpreter.
//! - [`city`]: city DTOs returned by the Batimap backend.
//! - [`artifact`]: the immutable snapshot consumed by a JOSM import.
//! - [`notify`]: per-call error notification policy.

pub mod artifact;
pub mod city;
pub mod error;
pub mod notify;
pub mod task;
pub mod types;
