//! Layered application configuration.
//!
//! Settings are merged with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config`, else `<platform config dir>/ddet/config.toml`)
//! 3. `DDET_*` environment variables (e.g. `DDET_IO_THREADS=8`)
//! 4. Command-line flags
//!
//! # Example
//!
//! ```toml
//! database = "/var/cache/ddet/ddet.db"
//! io_threads = 8
//! filter_slots = 20000
//! slots_per_entry = 2
//! progress = false
//! ```

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::filter::{FilterConfig, DEFAULT_SLOTS, DEFAULT_SLOTS_PER_ENTRY};
use crate::scanner::{ScannerConfig, DEFAULT_IO_THREADS};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "DDET_";

/// Errors raised while loading or checking configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A layer could not be parsed or had the wrong shape.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    MissingFile(PathBuf),

    /// A value is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Record database location; `None` means the platform default.
    pub database: Option<PathBuf>,
    /// Worker threads for stat and hash.
    pub io_threads: usize,
    /// Slots in the duplicate candidate filter.
    pub filter_slots: usize,
    /// Filter slots set per key.
    pub slots_per_entry: usize,
    /// Show progress spinners.
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            io_threads: DEFAULT_IO_THREADS,
            filter_slots: DEFAULT_SLOTS,
            slots_per_entry: DEFAULT_SLOTS_PER_ENTRY,
            progress: true,
        }
    }
}

impl Config {
    /// Load defaults, the configuration file and the environment.
    ///
    /// `explicit` replaces the default file location and must exist; the
    /// default file is optional.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a layer cannot be parsed or the explicit
    /// file is missing.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::MissingFile(path.to_path_buf()));
                }
                Self::load_from_path(path)
            }
            None => match Self::default_config_path() {
                Some(path) => Self::load_from_path(&path),
                None => Self::extract(Self::base_figment().merge(Env::prefixed(ENV_PREFIX))),
            },
        }
    }

    /// Load defaults, the TOML file at `path` (if present) and the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file or environment has values
    /// of the wrong type.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("Loading configuration from {}", path.display());
        Self::extract(
            Self::base_figment()
                .merge(Toml::file(path))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    fn base_figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Apply command-line overrides.
    pub fn merge_cli(&mut self, cli: &Cli) {
        if let Some(db) = &cli.db {
            self.database = Some(db.clone());
        }
        if let Some(n) = cli.io_threads {
            self.io_threads = n;
        }
        if let Some(n) = cli.filter_slots {
            self.filter_slots = n;
        }
        if let Some(n) = cli.slots_per_entry {
            self.slots_per_entry = n;
        }
        if cli.no_progress || cli.quiet {
            self.progress = false;
        }
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for zero threads or an unusable
    /// filter size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.io_threads == 0 {
            return Err(ConfigError::Invalid(
                "io_threads must be at least 1".to_string(),
            ));
        }
        self.filter_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Filter parameters for the duplicate index.
    #[must_use]
    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig::new(self.filter_slots, self.slots_per_entry)
    }

    /// Scanner parameters.
    #[must_use]
    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig::new(self.io_threads)
    }

    /// Configured database path, else the platform default.
    #[must_use]
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database
            .clone()
            .or_else(|| project_dirs().map(|d| d.data_dir().join("ddet.db")))
    }

    /// Default location of the configuration file.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|d| d.config_dir().join("config.toml"))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "lostbearlabs", "ddet")
}
