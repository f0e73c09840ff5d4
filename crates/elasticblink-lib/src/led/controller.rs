//! Broadcast color commands to every attached indicator.

use crate::device::{DeviceBackend, DeviceError, IndicatorDevice, Result};

use super::Color;

/// Result of one command on one device.
#[derive(Debug)]
pub struct DeviceOutcome {
    pub serial: String,
    pub result: Result<()>,
}

/// Per-device outcomes of a broadcast command.
///
/// Failures have already been logged. Callers that want fail-fast semantics
/// use [`Broadcast::into_result`].
#[derive(Debug, Default)]
pub struct Broadcast {
    pub outcomes: Vec<DeviceOutcome>,
}

impl Broadcast {
    /// Number of devices the command reached.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &DeviceOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// True if no device was attached.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Fail on the first device error, otherwise return the device count.
    pub fn into_result(self) -> Result<usize> {
        let count = self.outcomes.len();
        for outcome in self.outcomes {
            outcome.result?;
        }
        Ok(count)
    }
}

/// Issues color and power commands to every attached device.
///
/// The device set is enumerated afresh for each command.
#[derive(Debug, Clone, Default)]
pub struct DeviceController<B> {
    backend: B,
}

impl<B: DeviceBackend> DeviceController<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Set every attached device to `color`. Device failures are logged and skipped.
    pub fn set_color(&self, color: Color) -> std::result::Result<Broadcast, DeviceError> {
        self.broadcast(|dev| dev.set_color(color), |serial| {
            log::debug!("indicator {serial} turned on with color {color}");
        })
    }

    /// Turn every attached device off.
    pub fn power_off(&self) -> std::result::Result<Broadcast, DeviceError> {
        self.broadcast(|dev| dev.turn_off(), |serial| {
            log::debug!("indicator {serial} turned off");
        })
    }

    fn broadcast(
        &self,
        command: impl Fn(&B::Device) -> Result<()>,
        on_success: impl Fn(&str),
    ) -> std::result::Result<Broadcast, DeviceError> {
        let devices = self.backend.find_all()?;
        let outcomes = devices
            .iter()
            .map(|dev| {
                let result = command(dev);
                match &result {
                    Ok(()) => on_success(dev.serial()),
                    Err(e) => log::warn!("indicator {}: {e}", dev.serial()),
                }
                DeviceOutcome {
                    serial: dev.serial().to_string(),
                    result,
                }
            })
            .collect();
        Ok(Broadcast { outcomes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::MockBackend;

    #[test]
    fn set_color_reaches_every_device() {
        let backend = MockBackend::with_serials(&["A", "B"]);
        let ctl = DeviceController::new(backend.clone());
        let report = ctl.set_color(Color::YELLOW).unwrap();
        assert_eq!(report.succeeded(), 2);
        assert_eq!(backend.color_of("A"), Some(Color::YELLOW));
        assert_eq!(backend.color_of("B"), Some(Color::YELLOW));
    }

    #[test]
    fn failing_device_does_not_abort_batch() {
        let backend = MockBackend::with_serials(&["A", "B", "C"]);
        backend.set_failing("B", true);
        let ctl = DeviceController::new(backend.clone());

        let report = ctl.set_color(Color::RED).unwrap();
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.succeeded(), 2);
        let failed: Vec<_> = report.failures().map(|o| o.serial.as_str()).collect();
        assert_eq!(failed, vec!["B"]);
        assert_eq!(backend.color_of("C"), Some(Color::RED));
    }

    #[test]
    fn into_result_is_fail_fast() {
        let backend = MockBackend::with_serials(&["A", "B"]);
        backend.set_failing("A", true);
        let ctl = DeviceController::new(backend.clone());
        let err = ctl.set_color(Color::RED).unwrap().into_result().unwrap_err();
        assert!(matches!(err, DeviceError::CommandFailed(_)));
    }

    #[test]
    fn into_result_counts_devices() {
        let ctl = DeviceController::new(MockBackend::with_serials(&["A", "B"]));
        assert_eq!(ctl.power_off().unwrap().into_result().unwrap(), 2);
    }

    #[test]
    fn set_color_twice_equals_once() {
        let once = MockBackend::new();
        DeviceController::new(once.clone())
            .set_color(Color::BLUE)
            .unwrap();

        let twice = MockBackend::new();
        let ctl = DeviceController::new(twice.clone());
        ctl.set_color(Color::BLUE).unwrap();
        ctl.set_color(Color::BLUE).unwrap();

        assert_eq!(once.color_of("MOCK0001"), twice.color_of("MOCK0001"));
        assert_eq!(twice.color_of("MOCK0001"), Some(Color::BLUE));
    }

    #[test]
    fn power_off_outputs_zero() {
        let backend = MockBackend::with_serials(&["A", "B"]);
        let ctl = DeviceController::new(backend.clone());
        ctl.set_color(Color::WHITE).unwrap();
        ctl.power_off().unwrap();
        assert_eq!(backend.color_of("A"), Some(Color::OFF));
        assert_eq!(backend.color_of("B"), Some(Color::OFF));
    }

    #[test]
    fn no_devices_is_empty_broadcast() {
        let ctl = DeviceController::new(MockBackend::default());
        let report = ctl.set_color(Color::RED).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn devices_re_enumerated_per_command() {
        let backend = MockBackend::with_serials(&["A"]);
        let ctl = DeviceController::new(backend.clone());
        ctl.set_color(Color::RED).unwrap();
        backend.plug("B");
        ctl.set_color(Color::GREEN).unwrap();
        assert_eq!(backend.colors_for("B"), vec![Color::GREEN]);
        assert_eq!(backend.bus.borrow().enumerations, 2);
    }

    #[test]
    fn enumeration_failure_propagates() {
        let backend = MockBackend::new();
        backend.bus.borrow_mut().fail_enumeration = true;
        let ctl = DeviceController::new(backend);
        assert!(matches!(
            ctl.power_off(),
            Err(DeviceError::EnumerationFailed(_))
        ));
    }
}
