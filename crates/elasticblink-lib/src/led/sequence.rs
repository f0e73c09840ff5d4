//! Fixed indicator sequences: the unknown-state flashes and the startup color test.

use std::time::Duration;

use crate::device::{DeviceBackend, DeviceError};
use crate::monitor::Sleeper;

use super::{Color, DeviceController};

/// Number of white flashes in the unknown-state signal.
pub const UNKNOWN_FLASHES: usize = 3;
/// On and off time of each flash; three flashes take ~3 s.
pub const FLASH_HALF_PERIOD: Duration = Duration::from_millis(500);

/// Colors cycled by the startup self-test, in order.
pub const TEST_COLORS: [Color; 3] = [Color::RED, Color::GREEN, Color::BLUE];
/// How long each test color stays on.
pub const TEST_COLOR_HOLD: Duration = Duration::from_millis(500);

/// Flash white three times with the device off in between, leaving it off.
///
/// Returns `Ok(false)` if shutdown interrupted the sequence.
pub fn signal_unknown<B: DeviceBackend>(
    devices: &DeviceController<B>,
    sleeper: &impl Sleeper,
) -> Result<bool, DeviceError> {
    for _ in 0..UNKNOWN_FLASHES {
        devices.set_color(Color::WHITE)?;
        let completed = sleeper.sleep(FLASH_HALF_PERIOD);
        devices.power_off()?;
        if !completed || !sleeper.sleep(FLASH_HALF_PERIOD) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Show red, green, then blue, then power off.
///
/// Returns `Ok(false)` if shutdown interrupted the sequence.
pub fn test_colors<B: DeviceBackend>(
    devices: &DeviceController<B>,
    sleeper: &impl Sleeper,
) -> Result<bool, DeviceError> {
    for color in TEST_COLORS {
        let report = devices.set_color(color)?;
        if report.is_empty() {
            log::warn!("no indicator device attached for the color test");
        }
        if !sleeper.sleep(TEST_COLOR_HOLD) {
            devices.power_off()?;
            return Ok(false);
        }
    }
    devices.power_off()?;
    Ok(true)
}
