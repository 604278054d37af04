//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `ALUMTRACK_ROOT_FOLDER`
//! 3. `root_folder` key of the module TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or malformed TOML file never stops a service from starting:
//! it is logged and compiled defaults are used instead.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "ALUMTRACK_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "alumtrack.db";

/// Contents of `<config_dir>/alumtrack/<module>.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5730,
        }
    }
}

/// How an out-of-range instruction rating is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingPolicy {
    /// Reject the row
    #[default]
    Reject,
    /// Clamp into 1..=5 and keep the row
    Clamp,
}

/// Which write paths clear employment-dependent fields for non-employed alumni
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentNormalization {
    /// Bulk import, manual add and update all apply the rule
    #[default]
    AllWrites,
    /// Only the update path applies the rule; imports store rows verbatim
    UpdateOnly,
}

impl EmploymentNormalization {
    pub fn applies_to_import(self) -> bool {
        matches!(self, EmploymentNormalization::AllWrites)
    }
}

/// Limits and policies for the bulk import pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub max_upload_bytes: usize,
    pub max_rows: usize,
    pub rating_policy: RatingPolicy,
    pub employment_normalization: EmploymentNormalization,
    pub request_timeout_secs: u64,
    /// Upper bound on time spent retrying a write against a locked database
    pub lock_wait_ms: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            max_rows: 20_000,
            rating_policy: RatingPolicy::default(),
            employment_normalization: EmploymentNormalization::default(),
            request_timeout_secs: 120,
            lock_wait_ms: 5_000,
        }
    }
}

impl TomlConfig {
    /// Reject values that would make the service unusable
    pub fn validate(&self) -> Result<()> {
        if self.import.max_upload_bytes == 0 {
            return Err(Error::Config("import.max_upload_bytes must be > 0".to_string()));
        }
        if self.import.max_rows == 0 {
            return Err(Error::Config("import.max_rows must be > 0".to_string()));
        }
        if self.import.request_timeout_secs == 0 {
            return Err(Error::Config(
                "import.request_timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content).map_err(|source| Error::TomlParse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Load the module config, falling back to defaults on any problem
///
/// `explicit` is the `--config` argument; without it the platform config
/// directory is searched.
pub fn load_config_or_default(module_name: &str, explicit: Option<&Path>) -> TomlConfig {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => default_config_path(module_name).filter(|p| p.exists()),
    };

    let Some(path) = path else {
        info!("No config file for {}, using compiled defaults", module_name);
        return TomlConfig::default();
    };

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("Ignoring config file {}: {}", path.display(), e);
            TomlConfig::default()
        }
    }
}

/// `~/.config/alumtrack/<module>.toml` (or platform equivalent)
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("alumtrack").join(format!("{}.toml", module_name)))
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("alumtrack"))
        .unwrap_or_else(|| PathBuf::from("./alumtrack_data"))
}

/// Resolves the root folder following the priority order in the module docs
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_arg: None,
            toml_root: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml_config(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!("{}: root folder from command line", self.module_name);
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                info!("{}: root folder from {}", self.module_name, ROOT_FOLDER_ENV);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            info!("{}: root folder from TOML config", self.module_name);
            return path.clone();
        }

        default_root_folder()
    }
}

/// Creates the root folder and locates files inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }
}
