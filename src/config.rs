//! Data directory discovery and `config.yaml` loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::autosave::AutosaveConfig;
use crate::error::{NotesError, Result};

pub const DATA_DIR: &str = ".mdnotes";
pub const CONFIG_FILE: &str = "config.yaml";
pub const DEFAULT_DATABASE: &str = "mdnotes.db";
pub const DEFAULT_AUTOSAVE_MS: u64 = 2000;

/// Environment variable overriding `autosave_delay_ms`.
pub const AUTOSAVE_ENV: &str = "MDNOTES_AUTOSAVE_MS";

/// Settings read from `.mdnotes/config.yaml`. Missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database file name, relative to the data directory
    pub database: String,
    /// Inactivity window before an edit is written
    pub autosave_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            autosave_delay_ms: DEFAULT_AUTOSAVE_MS,
        }
    }
}

impl Config {
    /// Load the config for a data directory, then apply env overrides.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let mut config = Self::read(data_dir)?;
        config.apply_overrides(env::var(AUTOSAVE_ENV).ok().as_deref())?;
        Ok(config)
    }

    /// Read `config.yaml` without env overrides. An absent file is the default config.
    pub fn read(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, autosave_ms: Option<&str>) -> Result<()> {
        if let Some(raw) = autosave_ms {
            self.autosave_delay_ms = raw.trim().parse().map_err(|_| {
                NotesError::Config(format!("{} must be an integer, got '{}'", AUTOSAVE_ENV, raw))
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(NotesError::Config("database must not be empty".to_string()));
        }
        Ok(())
    }

    /// Write the config as YAML into the data directory.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(data_dir.join(CONFIG_FILE), yaml)?;
        Ok(())
    }

    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.database)
    }

    pub fn autosave(&self) -> AutosaveConfig {
        AutosaveConfig {
            quiescence: Duration::from_millis(self.autosave_delay_ms),
        }
    }
}

/// Walk upward from `start` looking for a `.mdnotes/` directory.
pub fn find_data_dir(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        let candidate = current.join(DATA_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

/// Resolve the data directory: an explicit path wins, otherwise discover
/// from the current directory.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        if dir.is_dir() {
            return Ok(dir.to_path_buf());
        }
        return Err(NotesError::NotInitialized);
    }
    let cwd = env::current_dir()?;
    find_data_dir(&cwd).ok_or(NotesError::NotInitialized)
}

/// Create a data directory with a default config file.
pub fn init_data_dir(data_dir: &Path) -> Result<()> {
    if data_dir.exists() {
        return Err(NotesError::AlreadyInitialized);
    }
    fs::create_dir_all(data_dir)?;
    Config::default().save(data_dir)?;
    Ok(())
}
