//! Configuration management for Canvas Fetcher
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! a TOML configuration file, and command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::filter::{ExtensionMode, ExtensionPolicy, FilterPolicy};
use crate::app::{ClientConfig, CoordinatorConfig};
use crate::constants::{canvas, config as paths, files, filter, http, logging};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Where the Canvas API lives
    pub canvas: CanvasSection,
    /// Which files are eligible for download
    pub filter: FilterSection,
    /// HTTP client settings
    pub client: ClientSection,
    /// Where and how files are downloaded
    pub download: DownloadSection,
    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSection {
    /// Canvas host, optionally with an explicit scheme
    pub host: String,
    /// REST API path prefix
    pub api_path: String,
}

impl Default for CanvasSection {
    fn default() -> Self {
        Self {
            host: canvas::DEFAULT_HOST.to_string(),
            api_path: canvas::DEFAULT_API_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSection {
    /// Size ceiling in megabytes (1 MB = 1,000,000 bytes)
    pub max_size_mb: u64,
    /// Extensions to allow or deny (empty = every extension passes)
    pub extensions: Vec<String>,
    /// Whether `extensions` is an allow list or a deny list
    pub mode: ExtensionMode,
}

impl Default for FilterSection {
    fn default() -> Self {
        Self {
            max_size_mb: filter::DEFAULT_MAX_SIZE_MB,
            extensions: Vec::new(),
            mode: ExtensionMode::Allow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds (None = no deadline)
    pub request_timeout_secs: Option<u64>,
    /// Maximum idle connections per host
    pub pool_max_per_host: usize,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            request_timeout_secs: None,
            pool_max_per_host: http::POOL_MAX_PER_HOST,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSection {
    /// Root under which one directory per course code is created
    pub destination: PathBuf,
    /// Abort the run when any course's file listing fails
    pub fail_fast: bool,
}

impl Default for DownloadSection {
    fn default() -> Self {
        Self {
            destination: PathBuf::from(files::DEFAULT_DESTINATION),
            fail_fast: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Values given on the command line; `None` keeps the configured value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub api_path: Option<String>,
    pub max_size_mb: Option<u64>,
    pub extensions: Option<(ExtensionMode, Vec<String>)>,
    pub destination: Option<PathBuf>,
    pub fail_fast: bool,
}

impl AppConfig {
    /// Load configuration from the first file found, or use defaults
    ///
    /// An explicitly named file must exist; the default locations are
    /// optional.
    pub async fn load(config_file_override: Option<&Path>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.to_path_buf(),
                    });
                }
                Some(path.to_path_buf())
            }
            None => Self::find_config_file(),
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(paths::LOCAL_CONFIG_FILE)];
        if let Some(user_path) = Self::default_config_path() {
            search_paths.push(user_path);
        }

        let found = search_paths.into_iter().find(|path| path.is_file());
        if let Some(path) = &found {
            debug!("Found config file: {}", path.display());
        }
        found
    }

    /// Config file path for the current user, if the platform has one
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(paths::CONFIG_DIR_NAME).join(paths::CONFIG_FILE_NAME))
    }

    /// Load configuration from a TOML file
    pub async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Check values a TOML file or the command line may have got wrong
    pub fn validate(&self) -> ConfigResult<()> {
        if self.filter.max_size_mb == 0 {
            return Err(invalid(
                "filter.max_size_mb",
                "0",
                "Maximum size must be at least 1 MB",
            ));
        }

        if self.canvas.host.trim().is_empty() {
            return Err(invalid("canvas.host", "", "Host cannot be empty"));
        }

        if !self.canvas.api_path.starts_with('/') {
            return Err(invalid(
                "canvas.api_path",
                &self.canvas.api_path,
                "API path must start with '/'",
            ));
        }

        if self.client.pool_max_per_host == 0 {
            return Err(invalid(
                "client.pool_max_per_host",
                "0",
                "Pool size must be at least 1",
            ));
        }

        Ok(())
    }

    /// Layer command-line values over the loaded configuration
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) -> ConfigResult<()> {
        if let Some(host) = overrides.host {
            self.canvas.host = host;
        }
        if let Some(api_path) = overrides.api_path {
            self.canvas.api_path = api_path;
        }
        if let Some(max_size_mb) = overrides.max_size_mb {
            self.filter.max_size_mb = max_size_mb;
        }
        if let Some((mode, extensions)) = overrides.extensions {
            self.filter.mode = mode;
            self.filter.extensions = extensions;
        }
        if let Some(destination) = overrides.destination {
            self.download.destination = destination;
        }
        // A flag can only turn fail-fast on
        self.download.fail_fast |= overrides.fail_fast;

        self.validate()
    }

    /// Runtime client settings
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            connect_timeout: Duration::from_secs(self.client.connect_timeout_secs),
            request_timeout: self.client.request_timeout_secs.map(Duration::from_secs),
            pool_max_per_host: self.client.pool_max_per_host,
            ..ClientConfig::default()
        }
        .with_host(self.canvas.host.clone())
        .with_api_path_prefix(self.canvas.api_path.clone())
    }

    /// Runtime filter policy
    pub fn filter_policy(&self) -> FilterPolicy {
        FilterPolicy::from_megabytes(
            self.filter.max_size_mb,
            ExtensionPolicy::with_mode(self.filter.mode, &self.filter.extensions),
        )
    }

    /// Runtime coordinator settings
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig::default()
            .with_destination(self.download.destination.clone())
            .with_fail_fast(self.download.fail_fast)
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
