//! Import artifact: the immutable snapshot a JOSM import works from.

use serde::{Deserialize, Serialize};

use crate::city::{Bbox, CityDTO, ConflateCityDTO};
use crate::types::Insee;

/// Default background imagery title.
pub const BDORTHO_TITLE: &str = "BDOrtho IGN";
/// Default background imagery TMS template.
pub const BDORTHO_URL: &str = "http://proxy-ign.openstreetmap.fr/bdortho/{z}/{x}/{y}.jpg";

/// A TMS imagery layer to register in the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagerySource {
    pub title: String,
    /// Tile template with `{z}/{x}/{y}` placeholders.
    pub url: String,
}

impl Default for ImagerySource {
    fn default() -> Self {
        Self {
            title: BDORTHO_TITLE.to_string(),
            url: BDORTHO_URL.to_string(),
        }
    }
}

/// Identity of the target city, used to name editor layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityRef {
    pub insee: Insee,
    pub name: String,
}

impl CityRef {
    pub fn new(insee: impl Into<Insee>, name: impl Into<String>) -> Self {
        Self {
            insee: insee.into(),
            name: name.into(),
        }
    }

    /// Name of the layer holding current OSM data for the city.
    pub fn osm_layer_name(&self) -> String {
        format!("Données OSM pour {} - {}", self.insee, self.name)
    }
}

impl From<&CityDTO> for CityRef {
    fn from(city: &CityDTO) -> Self {
        Self::new(city.insee.clone(), city.name.clone())
    }
}

/// Everything one editor import needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportArtifact {
    pub city: CityRef,
    pub imagery: ImagerySource,
    /// Simplified building geometry (`*-houses-simplifie.osm`).
    pub buildings_url: String,
    /// Segmentation predictions, when the backend produced them.
    pub segmentation_url: Option<String>,
    pub bbox: Bbox,
    /// OSM relation of the city boundary, when known.
    pub osm_relation_id: Option<i64>,
}

impl ImportArtifact {
    /// Build an artifact from a `josm` job result.
    ///
    /// Returns `None` when the job produced no building file.
    pub fn from_conflate(
        city: &CityDTO,
        dto: ConflateCityDTO,
        imagery: ImagerySource,
    ) -> Option<Self> {
        let buildings_url = dto.buildings_url.filter(|u| !u.is_empty())?;
        Some(Self {
            city: CityRef::from(city),
            imagery,
            buildings_url,
            segmentation_url: dto.segmentation_url.filter(|u| !u.is_empty()),
            bbox: dto.bbox,
            osm_relation_id: None,
        })
    }

    pub fn with_relation(mut self, osm_relation_id: Option<i64>) -> Self {
        self.osm_relation_id = osm_relation_id;
        self
    }
}
