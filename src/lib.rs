pub mod commands;
pub mod content;
pub mod db;
pub mod error;
pub mod models;
pub mod recorder;
pub mod session;
pub mod settings;
mod utils;
pub mod wizard;

use std::sync::Arc;

use anyhow::Context;
use content::ContentStore;
use db::Database;
use recorder::{BackupFileChannel, ResponseChannel, ResponseRecorder, SheetChannel};
use settings::{SettingsStore, StudySettings};
use tokio::io::BufReader;
use wizard::StudyController;

/// Primary sheet channel when its database opens, backup file otherwise.
pub fn build_recorder(settings: &StudySettings) -> ResponseRecorder {
    let primary: Option<Arc<dyn ResponseChannel>> =
        match Database::new(settings.responses_db.clone()) {
            Ok(database) => {
                log::info!("Recording responses to {}", database.path().display());
                Some(Arc::new(SheetChannel::new(database)))
            }
            Err(err) => {
                log::warn!(
                    "Response sheet unavailable, answers go to {}: {err:#}",
                    settings.backup_file.display()
                );
                None
            }
        };
    let fallback = Arc::new(BackupFileChannel::new(settings.backup_file.clone()));
    ResponseRecorder::new(primary, fallback)
}

fn serve() -> anyhow::Result<()> {
    let settings_store = SettingsStore::new(SettingsStore::default_path())?;
    let settings = settings_store.current();
    log::info!("Using settings from {}", settings_store.path().display());

    let content = ContentStore::load(&settings.content).context("failed to load study content")?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(async move {
        let recorder = build_recorder(&settings);
        let controller = StudyController::new(Arc::new(content), recorder, settings);
        commands::run_shell(&controller, BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    })
}

pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("roadtones starting up...");

    if let Err(err) = serve() {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
