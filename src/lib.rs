pub mod audio;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod presentation;
pub mod recorder;
pub mod settings;
pub mod utils;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};

use audio::{CpalRecorder, DevicePermissionGate, RodioPlayer};
use catalog::NoteCatalog;
use config::AppConfig;
use db::{Database, KeyValueStore, MemoryStore};
use recorder::{AudioBackends, VoiceNoteController};
use settings::SettingsStore;

pub use error::{Result as VoiceNoteResult, VoiceNoteError};

pub struct AppState {
    pub config: AppConfig,
    pub catalog: Arc<NoteCatalog>,
    pub settings: Arc<SettingsStore>,
    pub controller: VoiceNoteController,
}

impl AppState {
    /// SQLite-backed state with the platform audio backends.
    pub fn open(config: AppConfig) -> Result<Self> {
        prepare_dirs(&config)?;
        let database = Database::new(config.db_path())?;
        Ok(Self::with_parts(config.clone(), Arc::new(database), device_backends(&config)))
    }

    /// In-memory state; nothing but the audio files outlives the process.
    pub fn ephemeral(config: AppConfig) -> Result<Self> {
        prepare_dirs(&config)?;
        Ok(Self::with_parts(
            config.clone(),
            Arc::new(MemoryStore::new()),
            device_backends(&config),
        ))
    }

    pub fn with_parts(
        config: AppConfig,
        store: Arc<dyn KeyValueStore>,
        audio: AudioBackends,
    ) -> Self {
        let catalog = Arc::new(NoteCatalog::new(store.clone()));
        let settings = Arc::new(SettingsStore::new(store));
        let controller = VoiceNoteController::new(
            catalog.clone(),
            settings.clone(),
            audio,
            config.recordings_dir(),
        );

        Self {
            config,
            catalog,
            settings,
            controller,
        }
    }
}

fn prepare_dirs(config: &AppConfig) -> Result<()> {
    config.ensure_dirs()?;

    // Captures still in staging belong to a run that never stopped recording.
    let removed = config.clear_staging()?;
    if removed > 0 {
        warn!("Removed {removed} unfinished capture(s) from a previous run");
    }
    Ok(())
}

fn device_backends(config: &AppConfig) -> AudioBackends {
    AudioBackends {
        recorder: Arc::new(CpalRecorder::new(config.staging_dir())),
        player: Arc::new(RodioPlayer::new()),
        permissions: Arc::new(DevicePermissionGate),
    }
}

pub fn run() {
    utils::logging::init();

    let args = cli::Args::parse();
    let config = AppConfig::resolve(args.data_dir.clone());
    info!("Voice notes starting up (data dir {})", config.data_dir().display());

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start async runtime: {err}");
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(async move {
        let state = if args.ephemeral {
            AppState::ephemeral(config)?
        } else {
            AppState::open(config)?
        };
        let outcome = cli::dispatch(&state, args.command).await;
        state.controller.shutdown().await;
        outcome
    });

    if let Err(err) = result {
        error!("{err:#}");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
