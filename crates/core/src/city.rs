//! City DTOs returned by the Batimap backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Insee;

/// `date` value of a city whose cadastre is only available as raster.
pub const DATE_RASTER: &str = "raster";

/// Municipality summary (`GET /cities/<insee>`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityDTO {
    pub name: String,
    pub insee: Insee,
    /// Year of the latest cadastral import, or `unknown`, `never`, `raster`.
    pub date: String,
    #[serde(default)]
    pub josm_ready: bool,
    #[serde(default)]
    pub details: Option<CityDetailsDTO>,
    #[serde(default)]
    pub osm_buildings: Option<i64>,
    #[serde(default)]
    pub od_buildings: Option<i64>,
}

impl CityDTO {
    pub fn is_raster(&self) -> bool {
        self.date == DATE_RASTER
    }
}

/// Number of buildings imported per year, plus simplified building ids.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CityDetailsDTO {
    #[serde(default)]
    pub dates: BTreeMap<String, u64>,
    #[serde(default)]
    pub simplified: Vec<i64>,
}

/// Longitude/latitude bounding box.
///
/// The backend sends it as `[xmin, xmax, ymin, ymax]`, which is the
/// `left, right, bottom, top` order JOSM expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Bbox {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

impl From<[f64; 4]> for Bbox {
    fn from([left, right, bottom, top]: [f64; 4]) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
        }
    }
}

impl From<Bbox> for [f64; 4] {
    fn from(b: Bbox) -> Self {
        [b.left, b.right, b.bottom, b.top]
    }
}

/// Result of the `josm` backend job: where the prepared data lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflateCityDTO {
    #[serde(rename = "buildingsUrl", default)]
    pub buildings_url: Option<String>,
    // The backend misspells this key.
    #[serde(rename = "segmententationPredictionssUrl", default)]
    pub segmentation_url: Option<String>,
    pub bbox: Bbox,
    pub date: String,
}

/// Oldest-import city suggested for an update (`GET /cities/obsolete`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObsoleteCityDTO {
    /// `[lon, lat]` of a point inside the city.
    pub position: [f64; 2],
    pub city: CityDTO,
    /// OSM relation id of the city boundary.
    pub osmid: i64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn conflate_dto_reads_backend_keys() {
        let dto: ConflateCityDTO = serde_json::from_value(json!({
            "buildingsUrl": "https://cadastre.openstreetmap.fr/data/029/BREST-houses-simplifie.osm",
            "segmententationPredictionssUrl": "https://cadastre.openstreetmap.fr/data/029/BREST-houses-prediction_segmente.osm",
            "bbox": [-4.57, -4.42, 48.35, 48.46],
            "date": "2019"
        }))
        .unwrap();

        assert!(dto.buildings_url.unwrap().ends_with("simplifie.osm"));
        assert!(dto.segmentation_url.unwrap().ends_with("prediction_segmente.osm"));
        assert_eq!(
            dto.bbox,
            Bbox {
                left: -4.57,
                right: -4.42,
                bottom: 48.35,
                top: 48.46
            }
        );
    }

    #[test]
    fn bbox_serializes_back_to_array() {
        let bbox = Bbox::from([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(serde_json::to_value(bbox).unwrap(), json!([1.0, 2.0, 3.0, 4.0]));
    }

    #[test]
    fn city_without_optional_fields() {
        let city: CityDTO = serde_json::from_value(json!({
            "name": "Brest",
            "insee": "29019",
            "date": "raster"
        }))
        .unwrap();
        assert!(city.is_raster());
        assert!(!city.josm_ready);
        assert!(city.details.is_none());
    }

    #[test]
    fn obsolete_city_parses() {
        let obsolete: ObsoleteCityDTO = serde_json::from_value(json!({
            "position": [-4.48, 48.39],
            "city": {"name": "Brest", "insee": "29019", "date": "2012", "josm_ready": true,
                     "details": {"dates": {"2012": 3, "unknown": 1087}, "simplified": [1, 2]}},
            "osmid": 1076124
        }))
        .unwrap();
        assert_eq!(obsolete.osmid, 1076124);
        let details = obsolete.city.details.unwrap();
        assert_eq!(details.dates.get("unknown"), Some(&1087));
        assert_eq!(details.simplified, vec![1, 2]);
    }
}
