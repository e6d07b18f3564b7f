use anyhow::{Context, Result};
use batimap_cli::{commands, App, AppConfig, Cli};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "batimap=info,batimap_cli=info,batimap_backend=info,batimap_josm=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Invalid configuration")?;
    tracing::debug!(backend = %config.backend_url, josm = %config.josm_url, "Configuration loaded");
    let app = App::new(config)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    commands::run(&app, cli.command, cancel).await
}
