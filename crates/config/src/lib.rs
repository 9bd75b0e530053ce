//! Layered configuration.
//!
//! Sources are merged in order, later ones winning:
//!
//! 1. Built-in defaults (paths under the platform data directory).
//! 2. A TOML file: either the one passed explicitly or `libris.toml` in the
//!    platform config directory, if it exists.
//! 3. Environment variables prefixed `LIBRIS_`, with `__` separating nested
//!    keys (`LIBRIS_DATABASE__MAX_CONNECTIONS=8`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "LIBRIS_";
pub const CONFIG_FILE_NAME: &str = "libris.toml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "libris")
}

/// Where the configuration file is looked for when none is given.
pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn data_dir() -> PathBuf {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf()).unwrap_or_default()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file; created if missing.
    pub path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("catalog.db"),
            max_connections: 5,
            busy_timeout_ms: 1500,
        }
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory book files and covers are stored under.
    pub root: PathBuf,
    /// Backend name, used in logs.
    pub name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: data_dir().join("library"),
            name: "local".to_string(),
        }
    }
}

impl Config {
    /// Load and validate configuration from every source.
    ///
    /// An explicitly given file must exist; the default file is optional.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        if let Some(file) = file
            && !file.is_file()
        {
            exn::bail!(ErrorKind::Invalid(format!("config file {} does not exist", file.display())));
        }
        let config = Self::from_figment(Self::figment(file))?;
        tracing::debug!(?config, "loaded configuration");
        Ok(config)
    }

    /// The merged (but not yet extracted) sources.
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = file.map(Path::to_path_buf).or_else(default_config_file) {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.path.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("database.path must be set".to_string()));
        }
        if self.database.max_connections == 0 {
            exn::bail!(ErrorKind::Invalid("database.max_connections must be greater than zero".to_string()));
        }
        if !self.storage.root.is_absolute() {
            exn::bail!(ErrorKind::Invalid(format!(
                "storage.root must be an absolute path, got {:?}",
                self.storage.root
            )));
        }
        Ok(())
    }
}
