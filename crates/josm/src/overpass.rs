//! Overpass fallback for cities too large for a bbox download.

use crate::client::JosmError;

/// Public Overpass interpreter.
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Overpass QL fetching every object inside a municipality boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverpassQuery(String);

impl OverpassQuery {
    /// Match the boundary by name, at municipal or arrondissement level.
    pub fn for_place(name: &str) -> Self {
        let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
        Self(format!(
            "[out:xml][timeout:300]; \
             area[\"boundary\"=\"administrative\"][\"admin_level\"~\"8|9\"][\"name\"=\"{escaped}\"]->.a; \
             (nwr(area.a);); (._;>;); out meta;"
        ))
    }

    /// Overpass QL text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interpreter URL with the query in its `data` parameter.
    pub fn to_url(&self, endpoint: &str) -> Result<String, JosmError> {
        reqwest::Url::parse_with_params(endpoint, &[("data", self.as_str())])
            .map(String::from)
            .map_err(|e| JosmError::InvalidUrl {
                url: endpoint.to_string(),
                reason: e.to_string(),
            })
    }
}
