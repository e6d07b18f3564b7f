//! `batimap` command-line front end.
//!
//! Wires configuration, the backend client and the JOSM importer together,
//! and hosts the end-to-end "open in JOSM" flow in [`conflate`].

pub mod commands;
pub mod config;
pub mod conflate;

pub use commands::{App, Cli, Command};
pub use config::{AppConfig, ConfigError};
pub use conflate::{conflate_city, ConflateError, ConflateOutcome};
