//! Process wiring: real device backend, real health connector, real sleeper.

mod monitor;

use std::path::PathBuf;

pub(super) use elasticblink_lib::error::Result;
pub(super) use elasticblink_lib::monitor::ShutdownFlag;

/// Settings taken from the command line.
pub struct MonitorOptions {
    pub config_path: PathBuf,
    pub self_test: bool,
}

pub fn run(options: MonitorOptions, shutdown: ShutdownFlag) -> Result<()> {
    monitor::cmd_monitor(options, shutdown)
}
