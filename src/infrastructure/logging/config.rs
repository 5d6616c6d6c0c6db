use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::models::LoggingConfig;
use crate::infrastructure::config::ConfigError;

/// Resolved logger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Stdout format
    pub format: LogFormat,

    /// Directory for log files; stdout only when `None`
    pub log_dir: Option<PathBuf>,

    /// File rotation policy
    pub rotation: RotationPolicy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(ConfigError::InvalidLogFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

impl FromStr for RotationPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "hourly" => Ok(Self::Hourly),
            "never" => Ok(Self::Never),
            other => Err(ConfigError::InvalidRotation(other.to_string())),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}

impl TryFrom<&LoggingConfig> for LogConfig {
    type Error = ConfigError;

    fn try_from(config: &LoggingConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            level: config.level.clone(),
            format: config.format.parse()?,
            log_dir: config.log_dir.clone(),
            rotation: config.rotation.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_logging_config() {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            format: "json".to_string(),
            log_dir: Some(PathBuf::from("/tmp/tb-logs")),
            rotation: "hourly".to_string(),
        };
        let config = LogConfig::try_from(&logging).unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.rotation, RotationPolicy::Hourly);
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/tb-logs")));
    }

    #[test]
    fn test_rejects_unknown_values() {
        let logging = LoggingConfig {
            format: "xml".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(LogConfig::try_from(&logging), Err(ConfigError::InvalidLogFormat(_))));
        assert!("weekly".parse::<RotationPolicy>().is_err());
    }
}
