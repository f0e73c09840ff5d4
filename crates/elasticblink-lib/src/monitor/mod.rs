//! Poll loop state machine: configuration reload, self-test, health to color.
//!
//! [`Monitor`] owns the collaborators (device controller, health connector,
//! sleeper) and walks `Starting → SelfTest → Polling → Terminated`. Every
//! cycle re-reads the configuration file, so cluster name, credentials, color
//! table and poll period can be edited while the process runs. The loop ends
//! when the [`ShutdownFlag`] is raised, or when the configuration is missing
//! or invalid at any load (startup or reload) or the self-test fails.

mod sleep;

use std::path::PathBuf;
use std::time::Duration;

pub use sleep::{InterruptibleSleeper, ShutdownFlag, Sleeper};
#[doc(hidden)]
pub use sleep::mock;

use crate::config::Config;
use crate::device::DeviceBackend;
use crate::error::Result;
use crate::health::{self, Connector, HealthClient, HealthError};
use crate::led::{self, Color, DeviceController};
use crate::status::{self, StatusMapping};

/// Pause after a successful self-test before polling starts.
pub const SELF_TEST_SETTLE: Duration = Duration::from_secs(1);

/// Lifecycle of a [`Monitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Loading the configuration for the first time.
    Starting,
    /// Running the one-time device and connectivity test.
    SelfTest,
    /// Steady state.
    Polling,
    /// Stopped by shutdown or a fatal configuration or self-test error.
    Terminated,
}

/// What one poll cycle found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The cluster reported a status with a configured color.
    Healthy { status: String, color: Color },
    /// The cluster reported a status missing from the color table.
    UnmappedStatus(String),
    /// No health record carries the configured cluster name.
    ClusterMissing,
    /// The health endpoint could not be queried; retried next cycle.
    Unreachable(HealthError),
    /// No connection parameters configured.
    Disabled,
}

impl CycleOutcome {
    /// Whether this outcome is shown with the unknown-state signal.
    pub fn is_unknown(&self) -> bool {
        matches!(
            self,
            CycleOutcome::UnmappedStatus(_)
                | CycleOutcome::ClusterMissing
                | CycleOutcome::Unreachable(_)
        )
    }
}

/// Summary of one completed poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// Poll period in effect for this cycle.
    pub poll_period: Duration,
    /// False if shutdown interrupted the cycle's signal or sleep.
    pub completed: bool,
}

pub struct Monitor<B, C, S> {
    config_path: PathBuf,
    devices: DeviceController<B>,
    connector: C,
    sleeper: S,
    shutdown: ShutdownFlag,
    self_test: bool,
    self_tested: bool,
    state: MonitorState,
    last_status: Option<String>,
    cycles: u64,
}

impl<B, C, S> Monitor<B, C, S>
where
    B: DeviceBackend,
    C: Connector,
    S: Sleeper,
{
    pub fn new(
        config_path: impl Into<PathBuf>,
        devices: DeviceController<B>,
        connector: C,
        sleeper: S,
        shutdown: ShutdownFlag,
    ) -> Self {
        Monitor {
            config_path: config_path.into(),
            devices,
            connector,
            sleeper,
            shutdown,
            self_test: false,
            self_tested: false,
            state: MonitorState::Starting,
            last_status: None,
            cycles: 0,
        }
    }

    /// Enable the startup self-test.
    pub fn with_self_test(mut self, enabled: bool) -> Self {
        self.self_test = enabled;
        self
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Completed poll cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run until shutdown is requested.
    ///
    /// Returns `Err` when the configuration is missing or invalid at startup
    /// or at any reload, or when the self-test fails; the device is left as-is
    /// in that case. On shutdown the device is powered off and `Ok(())` is
    /// returned.
    pub fn run(&mut self) -> Result<()> {
        self.start()?;
        while !self.shutdown.is_requested() {
            self.run_cycle()?;
        }
        self.terminate();
        Ok(())
    }

    /// Load the configuration and, the first time only, run the self-test.
    pub fn start(&mut self) -> Result<Config> {
        self.state = MonitorState::Starting;
        log::info!("Configuration read from: {}", self.config_path.display());
        let config = match Config::load(&self.config_path) {
            Ok(config) => config,
            Err(e) => {
                self.state = MonitorState::Terminated;
                return Err(e.into());
            }
        };

        if self.self_test && !self.self_tested {
            self.state = MonitorState::SelfTest;
            if let Err(e) = self.run_self_test(&config) {
                self.state = MonitorState::Terminated;
                return Err(e);
            }
        }

        self.state = MonitorState::Polling;
        Ok(config)
    }

    fn run_self_test(&mut self, config: &Config) -> Result<()> {
        log::info!("Running initialisation test");
        if !led::test_colors(&self.devices, &self.sleeper)? {
            return Ok(());
        }

        match self.connector.connect(config)? {
            Some(client) => {
                if !client.ping() {
                    log::error!(
                        "Elasticsearch connection ping test FAILED. Please check the \
                         elastic_credentials in {}",
                        self.config_path.display()
                    );
                    return Err(crate::ElasticblinkError::SelfTest(
                        "Elasticsearch connection ping test failed".into(),
                    ));
                }
                log::info!("Elasticsearch connection ping test SUCCESS");
            }
            None => {
                log::error!(
                    "No elastic_credentials in {}, the ping test cannot run",
                    self.config_path.display()
                );
                return Err(crate::ElasticblinkError::SelfTest(
                    "no elastic_credentials configured to ping".into(),
                ));
            }
        }

        self.devices.power_off()?;
        self.sleeper.sleep(SELF_TEST_SETTLE);
        self.self_tested = true;
        Ok(())
    }

    /// One poll cycle: reload, query, signal, sleep.
    ///
    /// Fails, entering `Terminated`, if the configuration file is missing,
    /// unparsable or lacks a required field.
    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        let config = self.reload()?;
        let poll_period = config.poll_period();
        if config.poll_period_seconds.is_some() {
            log::debug!("Configuration found for `poll_period_seconds`: {poll_period:?}");
        }
        if config.status_color.is_some() {
            log::debug!("Configuration found for `status_color`");
        }

        let outcome = self.observe(&config);
        let completed = self.actuate(&config, &outcome) && self.sleeper.sleep(poll_period);
        self.cycles += 1;

        Ok(CycleReport {
            outcome,
            poll_period,
            completed,
        })
    }

    /// Power the indicator off and enter `Terminated`.
    pub fn terminate(&mut self) {
        log::info!("Shutting down, turning indicators off");
        if let Err(e) = self.devices.power_off() {
            log::warn!("could not turn indicators off: {e}");
        }
        self.state = MonitorState::Terminated;
    }

    fn reload(&mut self) -> Result<Config> {
        log::info!("Configuration read from: {}", self.config_path.display());
        Config::load(&self.config_path).map_err(|e| {
            log::error!("{e}");
            self.state = MonitorState::Terminated;
            crate::ElasticblinkError::from(e)
        })
    }

    fn observe(&self, config: &Config) -> CycleOutcome {
        let client = match self.connector.connect(config) {
            Ok(Some(client)) => client,
            Ok(None) => return CycleOutcome::Disabled,
            Err(e) => return CycleOutcome::Unreachable(e),
        };
        let records = match client.fetch_cluster_health() {
            Ok(records) => records,
            Err(e) => return CycleOutcome::Unreachable(e),
        };

        let cluster_name = config.cluster_name().unwrap_or_default();
        let Some(record) = health::find_cluster(&records, cluster_name) else {
            return CycleOutcome::ClusterMissing;
        };
        let matches = records.iter().filter(|r| r.cluster == cluster_name).count();
        if matches > 1 {
            log::debug!("{matches} health records named {cluster_name}, using the last one");
        }

        match status::map_status(&record.status, &config.status_table()) {
            StatusMapping::Mapped(color) => CycleOutcome::Healthy {
                status: record.status.clone(),
                color,
            },
            StatusMapping::Unmapped(label) => CycleOutcome::UnmappedStatus(label),
        }
    }

    /// Drive the indicator for `outcome`. Returns false if shutdown interrupted it.
    fn actuate(&mut self, config: &Config, outcome: &CycleOutcome) -> bool {
        let cluster_name = config.cluster_name().unwrap_or_default();
        match outcome {
            CycleOutcome::Healthy { status, color } => {
                if self.last_status.as_deref() != Some(status.as_str()) {
                    log::info!("Cluster {cluster_name} is {status} -> {}", led::format_color(*color));
                    self.last_status = Some(status.clone());
                }
                if let Err(e) = self.devices.set_color(*color) {
                    log::warn!("{e}");
                }
                return true;
            }
            CycleOutcome::Disabled => {
                log::warn!("No elastic_credentials configured, monitoring disabled");
                self.last_status = None;
                if let Err(e) = self.devices.power_off() {
                    log::warn!("{e}");
                }
                return true;
            }
            CycleOutcome::ClusterMissing => log::warn!(
                "Could not find the cluster specified in the configuration: {cluster_name}"
            ),
            CycleOutcome::UnmappedStatus(label) => log::warn!(
                "No color configured for status '{label}' of cluster {cluster_name}"
            ),
            CycleOutcome::Unreachable(e) => log::warn!("{e}; retrying next cycle"),
        }

        self.last_status = None;
        match led::signal_unknown(&self.devices, &self.sleeper) {
            Ok(completed) => completed,
            Err(e) => {
                log::warn!("{e}");
                !self.shutdown.is_requested()
            }
        }
    }
}
