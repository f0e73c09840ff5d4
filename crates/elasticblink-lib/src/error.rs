//! Unified error type for the elasticblink-lib crate.
//!
//! [`ElasticblinkError`] wraps module-specific errors (`DeviceError`,
//! `HealthError`, `ConfigError`) and the domain-specific kinds (`Color`,
//! `SelfTest`). `From` impls allow `?` to propagate across module boundaries.

use std::fmt;

use crate::config::ConfigError;
use crate::device::DeviceError;
use crate::health::HealthError;

/// Unified error type for elasticblink-lib operations.
#[derive(Debug)]
pub enum ElasticblinkError {
    /// Indicator device enumeration or command error.
    Device(DeviceError),
    /// Health endpoint error (connection, HTTP status, malformed body).
    Health(HealthError),
    /// Configuration file missing, unreadable, or invalid.
    Config(ConfigError),
    /// Color parsing or range error.
    Color(String),
    /// Startup self-test failed.
    SelfTest(String),
}

impl fmt::Display for ElasticblinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElasticblinkError::Device(e) => write!(f, "{e}"),
            ElasticblinkError::Health(e) => write!(f, "{e}"),
            ElasticblinkError::Config(e) => write!(f, "{e}"),
            ElasticblinkError::Color(e) => write!(f, "Color error: {e}"),
            ElasticblinkError::SelfTest(e) => write!(f, "Initialisation test failed: {e}"),
        }
    }
}

impl std::error::Error for ElasticblinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ElasticblinkError::Device(e) => Some(e),
            ElasticblinkError::Health(e) => Some(e),
            ElasticblinkError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DeviceError> for ElasticblinkError {
    fn from(e: DeviceError) -> Self {
        ElasticblinkError::Device(e)
    }
}

impl From<HealthError> for ElasticblinkError {
    fn from(e: HealthError) -> Self {
        ElasticblinkError::Health(e)
    }
}

impl From<ConfigError> for ElasticblinkError {
    fn from(e: ConfigError) -> Self {
        ElasticblinkError::Config(e)
    }
}

/// Crate-level Result alias using [`ElasticblinkError`].
pub type Result<T> = std::result::Result<T, ElasticblinkError>;
