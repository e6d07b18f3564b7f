//! JOSM remote-control client and import orchestration.
//!
//! JOSM listens on `127.0.0.1:8111` for remote-control GET requests. This
//! crate models those calls as [`ImportStep`]s, sends them with
//! [`JosmClient`], and sequences a full city import with [`JosmImporter`].

pub mod client;
pub mod orchestrator;
pub mod overpass;
pub mod steps;

pub use client::{JosmClient, JosmError, DEFAULT_JOSM_URL};
pub use orchestrator::{FileImport, ImportReport, JosmImporter, OsmLoad};
pub use overpass::{OverpassQuery, DEFAULT_OVERPASS_URL};
pub use steps::{DownloadPolicy, ImportStep};
