use std::fs::{create_dir_all, File};
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("no config directory available")]
    NoConfigDir,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub sample_rate: u32,
    pub default_timeout_ms: Option<u64>,
    pub default_track: Option<i32>,
    pub render_frames: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            sample_rate: 44100,
            default_timeout_ms: None,
            default_track: None,
            render_frames: 1024,
        }
    }
}

impl PlayerConfig {
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }
}

fn config_path() -> Result<PathBuf, StorageError> {
    let proj_dirs = ProjectDirs::from("com", "emu-bridge", "emu-bridge")
        .ok_or(StorageError::NoConfigDir)?;
    Ok(proj_dirs.config_dir().join("config.json"))
}

/// Loads the config, writing out the defaults the first time.
pub fn load_config() -> Result<PlayerConfig, StorageError> {
    let config_path = config_path()?;
    match File::open(&config_path) {
        Ok(config_file) => {
            let config: PlayerConfig = serde_json::from_reader(config_file)?;
            info!("loaded config from {}", config_path.display());
            Ok(config)
        }
        Err(_) => {
            info!("creating and saving default config");
            let config = PlayerConfig::default();
            if let Err(err) = save_config(&config) {
                warn!("could not save default config: {}", err);
            }
            Ok(config)
        }
    }
}

pub fn save_config(config: &PlayerConfig) -> Result<(), StorageError> {
    let config_path = config_path()?;
    if let Some(dir) = config_path.parent() {
        create_dir_all(dir)?;
    }
    debug!("saving config to {}", config_path.display());
    let config_file = File::create(config_path)?;
    serde_json::to_writer_pretty(config_file, config)?;
    Ok(())
}
