//! "Open in JOSM" flow: prepare the city data, wait for it, import it.

use batimap_backend::BatimapApi;
use batimap_core::artifact::{ImagerySource, ImportArtifact};
use batimap_core::city::CityDTO;
use batimap_core::error::TaskError;
use batimap_core::task::{TaskProgress, TaskState};
use batimap_core::types::Insee;
use batimap_josm::{ImportReport, JosmError, JosmImporter};
use futures::StreamExt;

#[derive(Debug, Clone, PartialEq)]
pub enum ConflateOutcome {
    Opened(ImportReport),
    /// The backend data is newer than the city summary. Nothing was opened;
    /// refresh the city and try again.
    DateChanged { date: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ConflateError {
    #[error("{insee} is a raster city, there is no vector data to import")]
    RasterCity { insee: Insee },

    /// The job succeeded without data (unknown city) or without a buildings file.
    #[error("JOSM data for {insee} finished without anything to import")]
    Unexpected { insee: Insee },

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Josm(#[from] JosmError),
}

/// Prepare the JOSM data of `city` and open it in the editor.
///
/// Every progress report is forwarded to `on_progress`. The backend job is
/// abandoned, and polling stops, if the returned future is dropped.
pub async fn conflate_city<F>(
    api: &BatimapApi,
    importer: &JosmImporter,
    city: &CityDTO,
    imagery: &ImagerySource,
    relation_id: Option<i64>,
    mut on_progress: F,
) -> Result<ConflateOutcome, ConflateError>
where
    F: FnMut(TaskProgress),
{
    if city.is_raster() {
        return Err(ConflateError::RasterCity {
            insee: city.insee.clone(),
        });
    }

    let mut events = api.city_josm_data(&city.insee);
    let mut conflate = None;
    while let Some(event) = events.next().await {
        let event = event?;
        if let Some(progress) = event.progress {
            on_progress(progress);
        }
        if event.state == TaskState::Success {
            conflate = event.result;
            break;
        }
    }
    drop(events);

    let unexpected = || ConflateError::Unexpected {
        insee: city.insee.clone(),
    };
    let dto = conflate.ok_or_else(unexpected)?;

    if dto.date != city.date {
        tracing::info!(
            insee = %city.insee,
            known = %city.date,
            latest = %dto.date,
            "City date changed while preparing JOSM data",
        );
        return Ok(ConflateOutcome::DateChanged { date: dto.date });
    }

    let artifact = ImportArtifact::from_conflate(city, dto, imagery.clone())
        .ok_or_else(unexpected)?
        .with_relation(relation_id);
    let report = importer.open_city(&artifact).await?;
    Ok(ConflateOutcome::Opened(report))
}
