use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::warn;

/// Environment variable pointing at the YAML configuration file.
pub const CONFIG_PATH_ENV: &str = "KUBE_ICINGA_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "kube-icinga.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid value for {key}: {value}")]
    InvalidOverride { key: &'static str, value: String },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub icinga: IcingaConfig,
    /// Remove every managed host and service on startup.
    pub cleanup: bool,
    /// Check command that must exist before reconciling (ex: "ping").
    pub check_command: Option<String>,
    pub log_level: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct IcingaConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    /// Icinga ships a self-signed CA by default.
    pub accept_invalid_certs: bool,
    pub timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            icinga: IcingaConfig::default(),
            cleanup: false,
            check_command: None,
            log_level: "info".into(),
        }
    }
}

impl Default for IcingaConfig {
    fn default() -> Self {
        Self {
            url: "https://localhost:5665".into(),
            username: "admin".into(),
            password: String::new(),
            accept_invalid_certs: false,
            timeout_secs: Some(30),
        }
    }
}

impl AppConfig {
    /// Applies `ICINGA_*` overrides; `lookup` is `std::env::var` outside tests.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("ICINGA_URL") {
            self.icinga.url = url;
        }
        if let Some(username) = lookup("ICINGA_USERNAME") {
            self.icinga.username = username;
        }
        if let Some(password) = lookup("ICINGA_PASSWORD") {
            self.icinga.password = password;
        }
        if let Some(raw) = lookup("ICINGA_ACCEPT_INVALID_CERTS") {
            self.icinga.accept_invalid_certs = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidOverride {
                        key: "ICINGA_ACCEPT_INVALID_CERTS",
                        value: raw,
                    })
                }
            };
        }
        Ok(())
    }
}

/// Reads a YAML config file; a missing or empty file yields the defaults.
pub async fn load_config_from(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        warn!("no config at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }

    let txt = fs::read_to_string(path).await.map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    if txt.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(&txt).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Loads the file named by `KUBE_ICINGA_CONFIG` then applies environment overrides.
pub async fn load_config() -> Result<AppConfig, ConfigError> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut config = load_config_from(&path).await?;
    config.apply_overrides(|key| std::env::var(key).ok())?;
    Ok(config)
}
