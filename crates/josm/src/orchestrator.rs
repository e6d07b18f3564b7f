//! Opens a prepared city in JOSM.
//!
//! The import is a fan-out join followed by a strictly sequential OSM data
//! load:
//!
//! ```text
//! imagery ─┐
//! buildings ─┼─ join ─> [load_object r<id>] ─> load_and_zoom ─(502)─> overpass import
//! segmentation ─┘
//! ```
//!
//! Missing files are skipped. A 502 from `load_and_zoom` means the bbox is
//! too large for the OSM API and triggers exactly one Overpass import. Every
//! call bypasses the user-facing notification: failures are returned.

use batimap_core::artifact::{CityRef, ImagerySource, ImportArtifact};
use batimap_core::notify::ErrorReporting;

use crate::client::{JosmClient, JosmError};
use crate::overpass::{OverpassQuery, DEFAULT_OVERPASS_URL};
use crate::steps::{DownloadPolicy, ImportStep};

const REPORTING: ErrorReporting = ErrorReporting::Bypass;

/// Outcome of one optional file import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileImport {
    /// The file exists and JOSM accepted the import.
    Imported,
    /// No URL, or the file did not answer a HEAD request.
    Skipped,
}

/// How the current OSM data reached the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsmLoad {
    /// `load_and_zoom` on the city bbox.
    Bbox,
    /// The bbox was too large; the city boundary was queried on Overpass.
    OverpassFallback,
}

/// What a finished [`JosmImporter::open_city`] loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub buildings: FileImport,
    pub segmentation: FileImport,
    pub osm: OsmLoad,
}

/// Sequences the remote-control calls of a city import.
#[derive(Debug, Clone)]
pub struct JosmImporter {
    client: JosmClient,
    overpass_url: String,
}

impl JosmImporter {
    /// Importer sending through `client`, with the public Overpass endpoint.
    pub fn new(client: JosmClient) -> Self {
        Self {
            client,
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
        }
    }

    /// Override the Overpass interpreter used for oversized cities.
    pub fn with_overpass_url(mut self, overpass_url: impl Into<String>) -> Self {
        self.overpass_url = overpass_url.into();
        self
    }

    /// Underlying remote-control client.
    pub fn client(&self) -> &JosmClient {
        &self.client
    }

    /// Load imagery, building files and current OSM data for a city.
    pub async fn open_city(&self, artifact: &ImportArtifact) -> Result<ImportReport, JosmError> {
        let city = &artifact.city;
        tracing::info!(insee = %city.insee, name = %city.name, "Opening city in JOSM");

        let (_, buildings, segmentation) = tokio::try_join!(
            self.add_imagery(&artifact.imagery),
            self.open_optional_file(Some(&artifact.buildings_url)),
            self.open_optional_file(artifact.segmentation_url.as_deref()),
        )?;

        let osm = self.load_osm_data(artifact).await?;

        tracing::info!(
            insee = %city.insee,
            ?buildings,
            ?segmentation,
            ?osm,
            "City opened in JOSM",
        );
        Ok(ImportReport {
            buildings,
            segmentation,
            osm,
        })
    }

    /// Load simplified building nodes into one layer, over the imagery.
    pub async fn open_nodes(
        &self,
        city: &CityRef,
        imagery: &ImagerySource,
        nodes: &[i64],
    ) -> Result<(), JosmError> {
        if nodes.is_empty() {
            return Ok(());
        }
        let ids = nodes
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let load = ImportStep::LoadObjects {
            objects: nodes.iter().map(|id| format!("n{id}")).collect(),
            layer_name: format!("Bâtiment simplifié {ids} dans {} - {}", city.insee, city.name),
        };

        tokio::try_join!(
            self.add_imagery(imagery),
            self.client.execute(&load, REPORTING),
        )?;
        tracing::info!(insee = %city.insee, count = nodes.len(), "Nodes opened in JOSM");
        Ok(())
    }

    // ---- private helpers ----

    async fn add_imagery(&self, imagery: &ImagerySource) -> Result<(), JosmError> {
        let step = ImportStep::Imagery {
            title: imagery.title.clone(),
            url: imagery.url.clone(),
        };
        self.client.execute(&step, REPORTING).await
    }

    async fn open_optional_file(&self, url: Option<&str>) -> Result<FileImport, JosmError> {
        let Some(url) = url else {
            return Ok(FileImport::Skipped);
        };
        if !self.client.exists(url).await {
            return Ok(FileImport::Skipped);
        }
        let step = ImportStep::Import {
            url: url.to_string(),
            // The todo plugin cannot work on locked layers.
            locked: false,
            download_policy: DownloadPolicy::Blocked,
            layer_name: None,
        };
        self.client.execute(&step, REPORTING).await?;
        Ok(FileImport::Imported)
    }

    async fn load_osm_data(&self, artifact: &ImportArtifact) -> Result<OsmLoad, JosmError> {
        let layer_name = artifact.city.osm_layer_name();

        let new_layer = match artifact.osm_relation_id {
            Some(relation) => {
                let boundary = ImportStep::LoadObjects {
                    objects: vec![format!("r{relation}")],
                    layer_name: layer_name.clone(),
                };
                self.client.execute(&boundary, REPORTING).await?;
                false
            }
            None => true,
        };

        let zoom = ImportStep::LoadAndZoom {
            layer_name: layer_name.clone(),
            new_layer,
            bbox: artifact.bbox,
        };
        match self.client.execute(&zoom, REPORTING).await {
            Ok(()) => Ok(OsmLoad::Bbox),
            Err(e) if e.is_payload_too_large() => {
                tracing::warn!(
                    insee = %artifact.city.insee,
                    "Bbox too large for the OSM API, falling back to Overpass",
                );
                let url = OverpassQuery::for_place(&artifact.city.name).to_url(&self.overpass_url)?;
                let import = ImportStep::Import {
                    url,
                    locked: false,
                    download_policy: DownloadPolicy::Normal,
                    layer_name: Some(layer_name),
                };
                self.client.execute(&import, REPORTING).await?;
                Ok(OsmLoad::OverpassFallback)
            }
            Err(e) => Err(e),
        }
    }
}
