//! Run the poll loop against attached BlinkSticks until Ctrl+C.

use elasticblink_lib::device::PlatformBackend;
use elasticblink_lib::health::ElasticConnector;
use elasticblink_lib::led::DeviceController;
use elasticblink_lib::monitor::{InterruptibleSleeper, Monitor};

use super::{MonitorOptions, Result, ShutdownFlag};

pub(super) fn cmd_monitor(options: MonitorOptions, shutdown: ShutdownFlag) -> Result<()> {
    let devices = DeviceController::new(PlatformBackend::default());
    let sleeper = InterruptibleSleeper::new(shutdown.clone());

    let mut monitor = Monitor::new(
        options.config_path,
        devices,
        ElasticConnector,
        sleeper,
        shutdown,
    )
    .with_self_test(options.self_test);

    log::info!("Monitoring, press Ctrl+C to stop");
    monitor.run()?;
    log::info!("Stopped after {} poll cycles", monitor.cycles());
    Ok(())
}
