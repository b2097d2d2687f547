use crate::logging::LogConfig;
use crate::uploader::{UnresolvedFolderPolicy, UploaderConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Application configuration stored as JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the drive backend, including the API prefix
    pub api_base_url: String,
    /// Bearer token for the backend
    pub access_token: Option<String>,
    /// Timeout for backend requests and connect timeout for direct writes
    pub request_timeout_secs: u64,
    /// Files per destination request and metadata commit
    pub chunk_size: usize,
    /// Direct writes in flight at once
    pub concurrency: usize,
    /// Pause after each folder creation
    pub folder_creation_delay_ms: u64,
    /// Retries for transient write failures (0 disables retrying)
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// What happens to files whose folder could not be created
    pub unresolved_folder_policy: UnresolvedFolderPolicy,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: LogLevel,
    /// Whether to write logs to file
    pub log_to_file: bool,
    /// Maximum number of log files to keep
    pub log_max_files: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            access_token: None,
            request_timeout_secs: 60,
            chunk_size: 50,
            concurrency: 5,
            folder_creation_delay_ms: 50,
            max_retries: 0,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 10_000,
            unresolved_folder_policy: UnresolvedFolderPolicy::MarkError,
            log_level: LogLevel::Info,
            log_to_file: true,
            log_max_files: 5,
        }
    }
}

impl AppConfig {
    /// Settings for the upload pipeline
    pub fn uploader_config(&self) -> UploaderConfig {
        UploaderConfig {
            chunk_size: self.chunk_size.max(1),
            concurrency: self.concurrency.max(1),
            folder_creation_delay: Duration::from_millis(self.folder_creation_delay_ms),
            max_retries: self.max_retries,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
            retry_max_delay: Duration::from_millis(self.retry_max_delay_ms),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            unresolved_folder_policy: self.unresolved_folder_policy,
        }
    }

    /// Settings for the backend client
    pub fn client_config(&self) -> drive_api::ClientConfig {
        let config = drive_api::ClientConfig::new(self.api_base_url.clone())
            .with_timeout(self.request_timeout_secs);
        match &self.access_token {
            Some(token) => config.with_access_token(token.clone()),
            None => config,
        }
    }

    /// Settings for the logging system
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level.as_str().to_string(),
            to_file: self.log_to_file,
            max_files: self.log_max_files,
            ..LogConfig::default()
        }
    }
}

/// Thread-safe configuration manager that persists settings to JSON
pub struct ConfigManager {
    config: RwLock<AppConfig>,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load from the default location (~/.drive-uploader/config.json)
    pub fn load_default() -> Result<Self> {
        Self::load(Self::default_config_path()?)
    }

    /// Load from `config_path`; a missing file yields the defaults
    pub fn load(config_path: impl Into<PathBuf>) -> Result<Self> {
        let config_path = config_path.into();
        let config = Self::load_from_path(&config_path)?;
        Ok(Self {
            config: RwLock::new(config),
            config_path,
        })
    }

    /// Get the config file path (~/.drive-uploader/config.json)
    pub fn default_config_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Failed to get user home directory")?;
        Ok(home_dir.join(".drive-uploader").join("config.json"))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from the specified path, using defaults for missing fields
    fn load_from_path(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            tracing::info!(target: "config", path = %path.display(), "Config file not found, using defaults");
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        // serde's #[serde(default)] handles missing fields automatically
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        tracing::info!(target: "config", path = %path.display(), "Loaded configuration from file");

        Ok(config)
    }

    /// Save the current configuration to disk
    fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
        }

        let config = self
            .config
            .read()
            .map_err(|e| anyhow::anyhow!("Failed to acquire read lock on config: {}", e))?;

        let content =
            serde_json::to_string_pretty(&*config).context("Failed to serialize config")?;

        fs::write(&self.config_path, content).context("Failed to write config file")?;

        tracing::debug!(target: "config", path = %self.config_path.display(), "Configuration saved");

        Ok(())
    }

    /// Get the current configuration (cloned)
    pub fn get_config(&self) -> AppConfig {
        self.config
            .read()
            .map(|c| c.clone())
            .unwrap_or_else(|_| AppConfig::default())
    }

    /// Update the configuration with a closure and persist to disk
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut AppConfig),
    {
        {
            let mut config = self
                .config
                .write()
                .map_err(|e| anyhow::anyhow!("Failed to acquire write lock on config: {}", e))?;
            f(&mut config);
        }
        self.save()
    }

    /// Store a new access token
    pub fn set_access_token(&self, token: Option<String>) -> Result<()> {
        self.update(|config| {
            config.access_token = token;
        })
    }
}
