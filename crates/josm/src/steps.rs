//! JOSM remote-control calls.
//!
//! Each [`ImportStep`] is one GET against the editor's control port: an
//! endpoint name plus query parameters. Steps carry no state of their own.

use std::fmt;

use batimap_core::city::Bbox;

/// Whether JOSM may download more data into an imported layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadPolicy {
    #[default]
    Normal,
    Blocked,
}

impl DownloadPolicy {
    /// Value of the `download_policy` query parameter.
    pub fn as_param(self) -> &'static str {
        match self {
            DownloadPolicy::Normal => "true",
            DownloadPolicy::Blocked => "never",
        }
    }
}

/// One remote-control call.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportStep {
    /// Register a TMS background layer.
    Imagery { title: String, url: String },

    /// Import an OSM file by URL into a new layer.
    Import {
        url: String,
        /// Locked layers cannot be edited or uploaded.
        locked: bool,
        download_policy: DownloadPolicy,
        layer_name: Option<String>,
    },

    /// Download objects (`n123`, `w45`, `r6`) into a new named layer.
    LoadObjects {
        objects: Vec<String>,
        layer_name: String,
    },

    /// Download everything inside `bbox` and zoom to it.
    LoadAndZoom {
        layer_name: String,
        new_layer: bool,
        bbox: Bbox,
    },
}

impl ImportStep {
    /// Remote-control endpoint, relative to the editor origin.
    pub fn endpoint(&self) -> &'static str {
        match self {
            ImportStep::Imagery { .. } => "imagery",
            ImportStep::Import { .. } => "import",
            ImportStep::LoadObjects { .. } => "load_object",
            ImportStep::LoadAndZoom { .. } => "load_and_zoom",
        }
    }

    /// Query parameters, in the order JOSM documents them.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            ImportStep::Imagery { title, url } => vec![
                ("title", title.clone()),
                ("type", "tms".to_string()),
                ("url", url.clone()),
            ],
            ImportStep::Import {
                url,
                locked,
                download_policy,
                layer_name,
            } => {
                let upload_policy = if *locked { "never" } else { "true" };
                let mut query = vec![
                    ("new_layer", "true".to_string()),
                    ("upload_policy", upload_policy.to_string()),
                    ("layer_locked", locked.to_string()),
                    ("download_policy", download_policy.as_param().to_string()),
                    ("url", url.clone()),
                ];
                if let Some(name) = layer_name {
                    query.push(("layer_name", name.clone()));
                }
                query
            }
            ImportStep::LoadObjects {
                objects,
                layer_name,
            } => vec![
                ("new_layer", "true".to_string()),
                ("objects", objects.join(",")),
                ("layer_name", layer_name.clone()),
            ],
            ImportStep::LoadAndZoom {
                layer_name,
                new_layer,
                bbox,
            } => vec![
                ("new_layer", new_layer.to_string()),
                ("layer_name", layer_name.clone()),
                ("left", bbox.left.to_string()),
                ("right", bbox.right.to_string()),
                ("bottom", bbox.bottom.to_string()),
                ("top", bbox.top.to_string()),
            ],
        }
    }
}

impl fmt::Display for ImportStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}
