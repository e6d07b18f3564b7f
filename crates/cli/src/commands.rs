//! Command-line surface of the `batimap` binary.

use anyhow::{bail, Context, Result};
use batimap_backend::{watch_tasks, BatimapApi};
use batimap_core::artifact::CityRef;
use batimap_core::city::CityDTO;
use batimap_core::task::{TaskDTO, TaskProgress, TaskState};
use batimap_josm::{FileImport, JosmImporter, OsmLoad};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::conflate::{conflate_city, ConflateOutcome};

/// Batimap companion: follow backend tasks and open cities in JOSM.
#[derive(Parser, Debug)]
#[command(name = "batimap")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Check that JOSM remote control is reachable.
    Status,

    /// Prepare a city's data and open it in JOSM.
    Open {
        insee: String,
        /// OSM relation of the city boundary, loaded before the bbox.
        #[arg(long)]
        relation: Option<i64>,
    },

    /// Open simplified building nodes of a city in JOSM.
    Node {
        insee: String,
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Refresh the import statistics of a city.
    Update { insee: String },

    /// List backend tasks.
    Tasks {
        #[arg(long)]
        insee: Option<String>,
        /// Follow the listed tasks until they finish.
        #[arg(long)]
        watch: bool,
    },

    /// Find the city with the oldest building import.
    Obsolete {
        /// Departments to skip, e.g. `29,56`.
        #[arg(long, value_delimiter = ',')]
        ignored: Vec<String>,
        /// Open it in JOSM, boundary relation included.
        #[arg(long)]
        open: bool,
    },
}

/// Clients shared by every command.
pub struct App {
    pub config: AppConfig,
    pub api: BatimapApi,
    pub importer: JosmImporter,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = config
            .http_client()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            api: config.backend(client.clone()),
            importer: config.importer(client),
            config,
        })
    }
}

/// Run `command` until it completes or `cancel` fires.
pub async fn run(app: &App, command: Command, cancel: CancellationToken) -> Result<()> {
    tokio::select! {
        result = dispatch(app, command) => result,
        _ = cancel.cancelled() => {
            tracing::warn!("Cancelled, polling stopped");
            Ok(())
        }
    }
}

async fn dispatch(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Status => status(app).await,
        Command::Open { insee, relation } => open(app, &insee, relation).await,
        Command::Node { insee, ids } => node(app, &insee, &ids).await,
        Command::Update { insee } => update(app, &insee).await,
        Command::Tasks { insee, watch } => tasks(app, insee.as_deref(), watch).await,
        Command::Obsolete { ignored, open } => obsolete(app, &ignored, open).await,
    }
}

// ---- commands ----

async fn status(app: &App) -> Result<()> {
    let client = app.importer.client();
    if client.is_started().await {
        println!("JOSM is running at {}", client.base_url());
        Ok(())
    } else {
        bail!("JOSM is unreachable at {}. Is remote control enabled?", client.base_url())
    }
}

async fn open(app: &App, insee: &str, relation: Option<i64>) -> Result<()> {
    let city = app.api.city(insee).await?;
    open_in_josm(app, &city, relation).await
}

async fn open_in_josm(app: &App, city: &CityDTO, relation: Option<i64>) -> Result<()> {
    if !app.importer.client().is_started().await {
        bail!("JOSM is not running, start it with remote control enabled");
    }
    let insee = city.insee.as_str();

    let outcome = conflate_city(
        &app.api,
        &app.importer,
        city,
        &app.config.imagery,
        relation,
        |progress| print_progress(insee, progress),
    )
    .await?;

    match outcome {
        ConflateOutcome::Opened(report) => {
            println!("{} ({insee}) opened in JOSM", city.name);
            if report.buildings == FileImport::Skipped {
                println!("  no buildings file was available");
            }
            if report.segmentation == FileImport::Skipped {
                println!("  no segmentation predictions");
            }
            if report.osm == OsmLoad::OverpassFallback {
                println!("  OSM data loaded through Overpass");
            }
        }
        ConflateOutcome::DateChanged { date } => {
            println!(
                "{} ({insee}) was imported again in {date} (was {}). Run `batimap update {insee}` first.",
                city.name, city.date
            );
        }
    }
    Ok(())
}

async fn node(app: &App, insee: &str, ids: &[i64]) -> Result<()> {
    let city = app.api.city(insee).await?;
    app.importer
        .open_nodes(&CityRef::from(&city), &app.config.imagery, ids)
        .await?;
    println!("{} node(s) of {} opened in JOSM", ids.len(), city.name);
    Ok(())
}

async fn update(app: &App, insee: &str) -> Result<()> {
    let mut events = app.api.update_city(insee);
    while let Some(event) = events.next().await {
        let event = event?;
        if let Some(progress) = event.progress {
            print_progress(insee, progress);
        }
        if let Some(city) = event.result {
            println!("{} ({}) is now dated {}", city.name, city.insee, city.date);
        }
    }
    Ok(())
}

async fn tasks(app: &App, insee: Option<&str>, watch: bool) -> Result<()> {
    let tasks = match insee {
        Some(insee) => app.api.city_tasks(insee).await?,
        None => app.api.tasks().await?,
    };
    if tasks.is_empty() {
        println!("No task queued");
        return Ok(());
    }
    for task in &tasks {
        println!("{}", describe(task));
    }
    if !watch {
        return Ok(());
    }

    let mut events = watch_tasks(&app.api, tasks, app.api.poll_config());
    while let Some((task, event)) = events.next().await {
        match event {
            Ok(status) if status.state == TaskState::Success => {
                println!("{} done", describe(&task));
            }
            Ok(status) => {
                if let Some(progress) = status.progress {
                    println!("{} {:.0}%", describe(&task), progress.percent());
                }
            }
            Err(e) => println!("{} failed: {e}", describe(&task)),
        }
    }
    Ok(())
}

async fn obsolete(app: &App, ignored: &[String], open: bool) -> Result<()> {
    let Some(obsolete) = app.api.obsolete_city(ignored).await? else {
        println!("No obsolete city left");
        return Ok(());
    };
    let [lon, lat] = obsolete.position;
    println!(
        "{} ({}) last imported {}, relation r{} at {lat:.5},{lon:.5}",
        obsolete.city.name, obsolete.city.insee, obsolete.city.date, obsolete.osmid
    );
    if open {
        open_in_josm(app, &obsolete.city, Some(obsolete.osmid)).await?;
    }
    Ok(())
}

// ---- private helpers ----

fn print_progress(insee: &str, progress: TaskProgress) {
    println!("{insee}: {:.0}%", progress.percent());
}

fn describe(task: &TaskDTO) -> String {
    let args = task
        .args
        .iter()
        .map(|a| a.as_str().map_or_else(|| a.to_string(), str::to_string))
        .collect::<Vec<_>>()
        .join(", ");
    let state = if task.running { "running" } else { "queued" };
    format!("{} {}({args}) [{state}]", task.task_id, task.name)
}
