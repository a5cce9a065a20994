use std::sync::Arc;

use anyhow::Context;
use papersync::config::{SyncConfig, db_path_from_env};
use papersync::session;
use papersync::source::LocalSource;
use papersync::storage::{PropertyStore, SqlitePropertyStore};
use papersync::sync::{RunReport, SyncRunner};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliMode {
    Run,
    Unpair,
    Help,
}

fn parse_cli_mode<I>(args: I) -> anyhow::Result<CliMode>
where
    I: IntoIterator<Item = String>,
{
    let mut mode = CliMode::Run;
    for arg in args.into_iter().skip(1) {
        match arg.as_str() {
            "--unpair" => mode = CliMode::Unpair,
            "--help" | "-h" => mode = CliMode::Help,
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(mode)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match parse_cli_mode(std::env::args())? {
        CliMode::Unpair => {
            let db_path = db_path_from_env()?;
            let store = SqlitePropertyStore::open(&db_path).await?;
            session::forget_credentials(&store).await?;
            tracing::info!("stored device credential removed");
            return Ok(());
        }
        CliMode::Help => {
            println!("Usage: papersync [--unpair]");
            println!("  --unpair   Remove the stored device credential and exit");
            println!();
            println!("Environment: PAPERSYNC_SOURCE, PAPERSYNC_TARGET_ROOT (required),");
            println!("  PAPERSYNC_MODE=update|mirror, PAPERSYNC_SKIP, PAPERSYNC_PAIRING_CODE,");
            println!("  PAPERSYNC_FORCE_UPDATE, PAPERSYNC_SEARCH_ROOT, PAPERSYNC_DB");
            return Ok(());
        }
        CliMode::Run => {}
    }

    let config = SyncConfig::from_env()?;
    let store: Arc<dyn PropertyStore> = Arc::new(
        SqlitePropertyStore::open(&config.db_path)
            .await
            .with_context(|| format!("failed to open {}", config.db_path.display()))?,
    );
    let target = Arc::new(session::connect(store.as_ref(), &config).await?);
    let source = Arc::new(LocalSource::new(config.search_root.clone()));

    let report = SyncRunner::prepare(config.run_config(), source, target, store)
        .await?
        .run()
        .await;
    finish(&report)
}

/// A prepared run has already logged its own failure; the process still exits
/// cleanly so batch callers see a completed invocation.
fn finish(report: &RunReport) -> anyhow::Result<()> {
    if report.error.is_some() {
        tracing::warn!(
            transferred = report.upload.transferred,
            "sync run ended early; completed work was kept"
        );
    }
    Ok(())
}
