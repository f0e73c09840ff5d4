//! Monitor configuration, a JSON (or TOML) document re-read every poll cycle.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::led::Color;
use crate::status::StatusColorTable;

/// Poll interval used when `poll_period_seconds` is absent.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Name of the cluster to watch, matched verbatim against `_cat/health` rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,

    /// Connection parameters. Absent = monitoring disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elastic_credentials: Option<ElasticCredentials>,

    /// Status label → color. Replaces the default table entirely when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_color: Option<HashMap<String, Color>>,

    /// Seconds between polls. Default: 60.
    #[serde(
        default,
        deserialize_with = "lenient_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub poll_period_seconds: Option<u64>,

    /// Upper bound on each HTTP request, in seconds. Absent = transport default.
    #[serde(
        default,
        deserialize_with = "lenient_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticCredentials {
    #[serde(default = "default_protocol")]
    pub protocol: String,
    pub host: String,
    #[serde(deserialize_with = "string_or_number")]
    pub port: String,
    #[serde(deserialize_with = "string_or_number")]
    pub user: String,
    #[serde(deserialize_with = "string_or_number")]
    pub pass: String,
}

fn default_protocol() -> String {
    "http".into()
}

impl ElasticCredentials {
    /// `protocol://host:port`
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Number(u64),
    Text(String),
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Lenient::deserialize(deserializer)? {
        Lenient::Number(n) => n.to_string(),
        Lenient::Text(s) => s,
    })
}

fn lenient_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    match Option::<Lenient>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Lenient::Number(n)) => Ok(Some(n)),
        Some(Lenient::Text(s)) => s.trim().parse().map(Some).map_err(|_| {
            serde::de::Error::custom(format!("expected a whole number of seconds, got \"{s}\""))
        }),
    }
}

/// On-disk format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// `.toml` → TOML, anything else → JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Why a configuration could not be used.
#[derive(Debug)]
pub enum ConfigError {
    NotFound(PathBuf),
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        message: String,
    },
    MissingClusterName,
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NotFound(path) => write!(
                f,
                "Config file specified does not exist: {}. Please check these details.",
                path.display()
            ),
            ConfigError::Read { path, source } => {
                write!(f, "Cannot read config file {}: {source}", path.display())
            }
            ConfigError::Parse { path, message } => {
                write!(f, "Config parse error ({}): {message}", path.display())
            }
            ConfigError::MissingClusterName => write!(
                f,
                "Missing 'cluster_name' attribute in your configuration. \
                 This should be present referencing the cluster you wish to monitor"
            ),
            ConfigError::Invalid(e) => write!(f, "Config error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl Config {
    /// Read, parse and validate the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load_unvalidated(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse without checking required fields.
    pub fn load_unvalidated(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, ConfigFormat::from_path(path)).map_err(|message| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            }
        })
    }

    /// Parse a configuration document.
    pub fn parse(contents: &str, format: ConfigFormat) -> Result<Self, String> {
        match format {
            ConfigFormat::Json => serde_json::from_str(contents).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(contents).map_err(|e| e.to_string()),
        }
    }

    /// Check required fields and value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster_name().is_none() {
            return Err(ConfigError::MissingClusterName);
        }
        if self.poll_period_seconds == Some(0) {
            return Err(ConfigError::Invalid(
                "poll_period_seconds must be at least 1".into(),
            ));
        }
        if self.request_timeout_seconds == Some(0) {
            return Err(ConfigError::Invalid(
                "request_timeout_seconds must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The configured cluster name, if present and not blank.
    pub fn cluster_name(&self) -> Option<&str> {
        self.cluster_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }

    /// Configured color table, or the default green/yellow/red table.
    pub fn status_table(&self) -> StatusColorTable {
        match &self.status_color {
            Some(table) => StatusColorTable::from(table.clone()),
            None => StatusColorTable::default(),
        }
    }

    /// Configured poll interval, or [`DEFAULT_POLL_PERIOD`].
    pub fn poll_period(&self) -> Duration {
        self.poll_period_seconds
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_PERIOD)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}
