//! elasticblink — Elasticsearch cluster health shown on a BlinkStick USB indicator.

pub mod config;
pub mod device;
pub mod error;
pub mod health;
pub mod led;
pub mod monitor;
pub mod status;

pub use error::ElasticblinkError;
