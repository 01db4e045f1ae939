//! Configuration persistence
//!
//! The configuration decides where port aliases come from when they are not
//! in the built-in table. It lives in `config.json` in the XDG config
//! directory; a missing or unreadable file means defaults.
//!
//! The `FWPORTS_SERVICES` environment variable overrides the stored source:
//! `getent`, `none`, or a path to a services file.

use crate::core::error::{Error, Result};
use crate::core::services::{Getent, ServiceDatabase, ServiceTable};
use crate::utils::get_config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides [`AppConfig::services_source`].
pub const SERVICES_ENV: &str = "FWPORTS_SERVICES";

const CONFIG_FILE: &str = "config.json";

/// Where names missing from the built-in alias table are looked up.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ServicesSource {
    /// `getent services <key>`, one query per key
    #[default]
    Getent,
    /// Parse [`AppConfig::services_file`] once at startup
    File,
    /// Built-in table only
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub services_source: ServicesSource,
    #[serde(default = "default_services_file")]
    pub services_file: PathBuf,
    #[serde(default = "default_getent_path")]
    pub getent_path: PathBuf,
    /// Log filter used when neither `FWPORTS_LOG` nor `RUST_LOG` is set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            services_source: ServicesSource::default(),
            services_file: default_services_file(),
            getent_path: default_getent_path(),
            log_level: default_log_level(),
        }
    }
}

fn default_services_file() -> PathBuf {
    PathBuf::from(option_env!("FWPORTS_SYSTEM_SERVICES_FILE").unwrap_or("/etc/services"))
}

fn default_getent_path() -> PathBuf {
    PathBuf::from("getent")
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl AppConfig {
    /// Applies a `FWPORTS_SERVICES` value on top of the stored settings.
    ///
    /// `getent` and `none` select that source; anything else is taken as a
    /// services file path. Empty values are ignored.
    pub fn with_services_override(mut self, value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            return self;
        }
        match value.parse::<ServicesSource>() {
            Ok(ServicesSource::File) | Err(_) => {
                self.services_source = ServicesSource::File;
                self.services_file = PathBuf::from(value);
            }
            Ok(source) => self.services_source = source,
        }
        tracing::debug!("Services source overridden by {}: {}", SERVICES_ENV, value);
        self
    }

    /// Applies `FWPORTS_SERVICES` from the process environment, if set.
    pub fn with_env_overrides(self) -> Self {
        match std::env::var(SERVICES_ENV) {
            Ok(value) => self.with_services_override(&value),
            Err(_) => self,
        }
    }

    /// Opens the service database this configuration selects.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the services file cannot be read, or if the configured
    /// `getent_path` is empty.
    pub fn open_service_database(&self) -> Result<Box<dyn ServiceDatabase>> {
        match self.services_source {
            ServicesSource::Getent => {
                if self.getent_path.as_os_str().is_empty() {
                    return Err(Error::Config("getent_path is empty".to_string()));
                }
                let getent = Getent::new(&self.getent_path);
                tracing::debug!("Using {} for service lookups", getent.program().display());
                Ok(Box::new(getent))
            }
            ServicesSource::File => {
                let table = ServiceTable::load(&self.services_file)?;
                if table.is_empty() {
                    tracing::warn!(
                        "No services found in {}, only built-in aliases will resolve",
                        self.services_file.display()
                    );
                }
                Ok(Box::new(table))
            }
            ServicesSource::None => Ok(Box::new(ServiceTable::default())),
        }
    }
}

/// Path of `config.json` in the XDG config directory.
pub fn config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Saves the config to `path` using an atomic write pattern.
/// 1. Writes to a temporary file next to it.
/// 2. Sets restrictive permissions (0o600).
/// 3. Atomically renames to the target path.
pub async fn save_config_to(path: &Path, config: &AppConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    let temp_path = path.with_extension("json.tmp");

    // Create file with restrictive permissions from the start to prevent
    // race condition where file is briefly world-readable
    #[cfg(unix)]
    {
        use tokio::fs::OpenOptions;
        use tokio::io::AsyncWriteExt;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600)
            .open(&temp_path)
            .await?;

        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
    }

    #[cfg(not(unix))]
    {
        use tokio::io::AsyncWriteExt;

        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
    }

    tokio::fs::rename(&temp_path, path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::StorageFull {
            std::io::Error::new(
                std::io::ErrorKind::StorageFull,
                "Disk full: cannot save configuration. Free up space and try again.",
            )
        } else {
            e
        }
    })?;

    tracing::info!("Saved configuration to {}", path.display());
    Ok(())
}

/// Saves the config to the XDG config directory.
///
/// # Errors
///
/// Returns `Err` if no home directory is known or the write fails.
pub async fn save_config(config: &AppConfig) -> Result<PathBuf> {
    let path = config_path()
        .ok_or_else(|| Error::Config("no configuration directory available".to_string()))?;
    save_config_to(&path, config).await?;
    Ok(path)
}

/// Loads the config from `path`, or returns default if missing or invalid.
pub async fn load_config_from(path: &Path) -> AppConfig {
    match tokio::fs::read_to_string(path).await {
        Ok(json) => match serde_json::from_str::<AppConfig>(&json) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
                AppConfig::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(e) => {
            tracing::warn!("Cannot read config {}: {}", path.display(), e);
            AppConfig::default()
        }
    }
}

/// Loads the app config from the XDG config directory.
pub async fn load_config() -> AppConfig {
    match config_path() {
        Some(path) => load_config_from(&path).await,
        None => AppConfig::default(),
    }
}
