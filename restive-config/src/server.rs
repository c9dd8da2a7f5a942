// Server configuration

use crate::loader::merge;
use crate::{ConfigError, ConfigLoader, ConfigValidator, EnvLoader, Result, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8080";
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
/// Prefix of environment variables read by [`ServerConfig::load`].
pub const ENV_PREFIX: &str = "RESTIVE_";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "warning", "error"];
const LOG_FORMATS: &[&str] = &["json", "plain", "pretty", "compact"];

/// Logging section of [`ServerConfig`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub format: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

/// Everything needed to start a server
///
/// ```toml
/// address = "0.0.0.0:8080"
/// max_body_bytes = 1048576
///
/// [log]
/// level = "debug"
/// format = "pretty"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub max_body_bytes: usize,
    pub log: LogSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            log: LogSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults, then `path` (if any), then `.env`, then `RESTIVE_*`
    /// variables. The result is validated.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        // A missing .env is not an error
        dotenvy::dotenv().ok();

        let vars = EnvLoader::new(Some(ENV_PREFIX.to_string())).load()?;
        config.apply_env(&vars)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with a JSON or TOML file. Not validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = ConfigLoader::auto(path)?.load_file(path)?;
        Self::from_value(file)
    }

    /// Defaults overlaid with a parsed value tree. Not validated.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let mut tree = serde_json::to_value(Self::default())
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;
        merge(&mut tree, value);
        serde_json::from_value(tree).map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    /// Apply variables already stripped of their prefix and lowercased.
    /// Unknown keys are ignored.
    pub fn apply_env(&mut self, vars: &HashMap<String, String>) -> Result<()> {
        if let Some(address) = vars.get("address") {
            self.address = address.clone();
        }
        if let Some(raw) = vars.get("max_body_bytes") {
            self.max_body_bytes = raw.trim().parse().map_err(|e| {
                ConfigError::ParseError(format!(
                    "{}MAX_BODY_BYTES must be a byte count, got '{}': {}",
                    ENV_PREFIX, raw, e
                ))
            })?;
        }
        if let Some(level) = vars.get("log_level") {
            self.log.level = level.clone();
        }
        if let Some(format) = vars.get("log_format") {
            self.log.format = format.clone();
        }
        Ok(())
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.address, "address")?;
        ConfigValidator::in_range(self.max_body_bytes, 1, usize::MAX, "max_body_bytes")?;
        ConfigValidator::one_of(&self.log.level, LOG_LEVELS, "log.level")?;
        ConfigValidator::one_of(&self.log.format, LOG_FORMATS, "log.format")?;
        Ok(())
    }
}
