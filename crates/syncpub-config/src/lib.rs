//! Configuration management for syncpub.
//!
//! Parses `syncpub.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `storage.data_dir`

mod expand;

use std::path::{Path, PathBuf};

use serde::Deserialize;
use syncpub_registry::{BackendKind, Policy};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override readonly flag.
    pub readonly: Option<bool>,
    /// Override whether pushes may create workspaces.
    pub allow_push_to_new_workspaces: Option<bool>,
    /// Override discoverable flag.
    pub discoverable: Option<bool>,
    /// Override storage backend.
    pub backend: Option<StorageBackend>,
    /// Override data directory.
    pub data_dir: Option<PathBuf>,
    /// Override log level.
    pub log_level: Option<u8>,
    /// Override demo seeding.
    pub seed_demo: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "syncpub.toml";

/// Highest accepted log level.
pub const MAX_LOG_LEVEL: u8 = 3;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Access policy.
    pub policy: PolicyConfig,
    /// Storage configuration (paths are relative strings from TOML).
    storage: StorageConfigRaw,
    /// Logging configuration.
    pub log: LogConfig,

    /// Resolved storage configuration (set after loading).
    #[serde(skip)]
    pub storage_resolved: StorageConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3333,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Access policy as written in the config file.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Refuse all pushes.
    pub readonly: bool,
    /// Create unknown workspaces on push.
    pub allow_push_to_new_workspaces: bool,
    /// List workspace ids on the index page.
    pub discoverable: bool,
    /// Seed the demo workspace at startup.
    pub seed_demo: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            readonly: false,
            allow_push_to_new_workspaces: true,
            discoverable: false,
            seed_demo: true,
        }
    }
}

/// Storage engine selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Keep workspaces in memory.
    #[default]
    Memory,
    /// One SQLite file per workspace.
    Sqlite,
}

impl From<StorageBackend> for BackendKind {
    fn from(backend: StorageBackend) -> Self {
        match backend {
            StorageBackend::Memory => Self::Volatile,
            StorageBackend::Sqlite => Self::Persistent,
        }
    }
}

/// Raw storage configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StorageConfigRaw {
    backend: StorageBackend,
    data_dir: Option<String>,
}

/// Resolved storage configuration with an absolute data directory.
#[derive(Debug, Default)]
pub struct StorageConfig {
    /// Storage engine.
    pub backend: StorageBackend,
    /// Directory holding SQLite files.
    pub data_dir: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// 0 = warnings only, 1 = basic, 2 = verbose, 3 = include workspace ids.
    pub level: u8,
}

impl LogConfig {
    /// `tracing` filter directive for this level.
    #[must_use]
    pub fn filter_directive(&self) -> &'static str {
        match self.level {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`server.host`").
        field: String,
        /// Error message (e.g., "${`SYNCPUB_HOST`} not set").
        message: String,
    },
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `syncpub.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values. The merged result
    /// is validated.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails, or
    /// the merged configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Process policy derived from this configuration.
    ///
    /// Readonly servers never create workspaces on push.
    #[must_use]
    pub fn to_policy(&self) -> Policy {
        Policy {
            readonly: self.policy.readonly,
            allow_push_to_new_workspaces: self.policy.allow_push_to_new_workspaces
                && !self.policy.readonly,
            discoverable: self.policy.discoverable,
            backend: self.storage_resolved.backend.into(),
            storage_root: self.storage_resolved.data_dir.clone(),
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.is_empty() {
            return Err(ConfigError::Validation("server.host cannot be empty".to_owned()));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port cannot be 0".to_owned()));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Validation(
                "server.max_body_bytes must be greater than 0".to_owned(),
            ));
        }
        if self.log.level > MAX_LOG_LEVEL {
            return Err(ConfigError::Validation(format!(
                "log.level cannot exceed {MAX_LOG_LEVEL}"
            )));
        }
        Ok(())
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(readonly) = settings.readonly {
            self.policy.readonly = readonly;
        }
        if let Some(allow) = settings.allow_push_to_new_workspaces {
            self.policy.allow_push_to_new_workspaces = allow;
        }
        if let Some(discoverable) = settings.discoverable {
            self.policy.discoverable = discoverable;
        }
        if let Some(seed_demo) = settings.seed_demo {
            self.policy.seed_demo = seed_demo;
        }
        if let Some(backend) = settings.backend {
            self.storage_resolved.backend = backend;
        }
        if let Some(data_dir) = &settings.data_dir {
            self.storage_resolved.data_dir.clone_from(data_dir);
        }
        if let Some(level) = settings.log_level {
            self.log.level = level;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            policy: PolicyConfig::default(),
            storage: StorageConfigRaw::default(),
            log: LogConfig::default(),
            storage_resolved: StorageConfig {
                backend: StorageBackend::Memory,
                data_dir: base.to_path_buf(),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;
        if let Some(ref dir) = self.storage.data_dir {
            self.storage.data_dir = Some(expand::expand_env(dir, "storage.data_dir")?);
        }
        Ok(())
    }

    /// Resolve the data directory against the config file's directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.storage_resolved = StorageConfig {
            backend: self.storage.backend,
            data_dir: config_dir.join(self.storage.data_dir.as_deref().unwrap_or(".")),
        };
    }
}
