//! Indicator device access: traits plus the Linux USB backend.
//!
//! A [`DeviceBackend`] enumerates the indicator devices attached right now;
//! each [`IndicatorDevice`] accepts a full-brightness color. Enumeration is
//! cheap and happens again for every command, so nothing here holds a device
//! open between commands.

use std::fmt;

use crate::led::Color;

// ── Error type ──

/// Indicator device errors.
///
/// String payloads follow the convention **"context: details"** where
/// *context* identifies the step (e.g. `"USB open"`) and *details* describes
/// what went wrong.
#[derive(Debug, Clone)]
pub enum DeviceError {
    EnumerationFailed(String),
    OpenFailed(String),
    CommandFailed(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::EnumerationFailed(e) => write!(f, "Device enumeration failed: {e}"),
            DeviceError::OpenFailed(e) => write!(f, "Failed to open device: {e}"),
            DeviceError::CommandFailed(e) => write!(f, "Device command failed: {e}"),
        }
    }
}

impl std::error::Error for DeviceError {}

pub type Result<T> = std::result::Result<T, DeviceError>;

// ── Traits ──

/// One attached indicator.
pub trait IndicatorDevice {
    /// Serial number, or a bus path when the device reports none.
    fn serial(&self) -> &str;

    /// Set the whole indicator to `color` at full brightness.
    fn set_color(&self, color: Color) -> Result<()>;

    /// Output zero on every channel.
    fn turn_off(&self) -> Result<()> {
        self.set_color(Color::OFF)
    }
}

/// Source of the indicator devices currently attached to the host.
pub trait DeviceBackend {
    type Device: IndicatorDevice;

    fn find_all(&self) -> Result<Vec<Self::Device>>;
}

// ── Linux backend ──

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::*;
    use std::time::Duration;

    use nusb::transfer::{Control, ControlType, Recipient};

    /// BlinkStick USB vendor ID.
    pub const BLINKSTICK_VID: u16 = 0x20A0;
    /// BlinkStick USB product ID.
    pub const BLINKSTICK_PID: u16 = 0x41E5;

    /// HID `SET_REPORT` class request.
    const HID_SET_REPORT: u8 = 0x09;
    /// Feature report carrying a single RGB value for the whole device.
    const REPORT_COLOR: u16 = 0x0001;
    const USB_TIMEOUT_MS: u64 = 1000;

    /// Build the color feature report: `[0, r, g, b]`.
    pub fn color_report(color: Color) -> [u8; 4] {
        [0, color.r, color.g, color.b]
    }

    /// A BlinkStick found on the bus (opened only while a command runs).
    pub struct BlinkStick {
        info: nusb::DeviceInfo,
        serial: String,
    }

    impl IndicatorDevice for BlinkStick {
        fn serial(&self) -> &str {
            &self.serial
        }

        fn set_color(&self, color: Color) -> Result<()> {
            let device = self
                .info
                .open()
                .map_err(|e| DeviceError::OpenFailed(format!("USB open {}: {e}", self.serial)))?;

            // usbhid owns interface 0; detach it for the duration of the transfer
            let interface = device.detach_and_claim_interface(0).map_err(|e| {
                DeviceError::OpenFailed(format!("claim interface 0 on {}: {e}", self.serial))
            })?;

            let control = Control {
                control_type: ControlType::Class,
                recipient: Recipient::Device,
                request: HID_SET_REPORT,
                value: REPORT_COLOR,
                index: 0,
            };
            interface
                .control_out_blocking(
                    control,
                    &color_report(color),
                    Duration::from_millis(USB_TIMEOUT_MS),
                )
                .map_err(|e| {
                    DeviceError::CommandFailed(format!("SET_REPORT on {}: {e}", self.serial))
                })?;
            Ok(())
        }
    }

    /// Enumerates BlinkSticks with `nusb`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct UsbBackend;

    impl DeviceBackend for UsbBackend {
        type Device = BlinkStick;

        fn find_all(&self) -> Result<Vec<BlinkStick>> {
            let devices = nusb::list_devices()
                .map_err(|e| DeviceError::EnumerationFailed(format!("USB enumeration: {e}")))?;

            Ok(devices
                .filter(|dev| dev.vendor_id() == BLINKSTICK_VID && dev.product_id() == BLINKSTICK_PID)
                .map(|dev| {
                    let serial = dev.serial_number().map(str::to_string).unwrap_or_else(|| {
                        format!("usb:{:03}/{:03}", dev.bus_number(), dev.device_address())
                    });
                    BlinkStick { info: dev, serial }
                })
                .collect())
        }
    }
}

#[cfg(target_os = "linux")]
pub use linux_impl::{BLINKSTICK_PID, BLINKSTICK_VID, BlinkStick, UsbBackend, color_report};

// ── Stub backend for unsupported platforms ──

/// Device type that cannot be constructed.
#[cfg(not(target_os = "linux"))]
pub enum NoDevice {}

#[cfg(not(target_os = "linux"))]
impl IndicatorDevice for NoDevice {
    fn serial(&self) -> &str {
        match *self {}
    }
    fn set_color(&self, _color: Color) -> Result<()> {
        match *self {}
    }
}

/// Backend that never finds a device.
/// Enables compilation and `cargo test` on unsupported hosts.
#[cfg(not(target_os = "linux"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct StubBackend;

#[cfg(not(target_os = "linux"))]
impl DeviceBackend for StubBackend {
    type Device = NoDevice;

    fn find_all(&self) -> Result<Vec<NoDevice>> {
        Ok(Vec::new())
    }
}

/// Concrete backend for the current platform.
#[cfg(target_os = "linux")]
pub type PlatformBackend = UsbBackend;
#[cfg(not(target_os = "linux"))]
pub type PlatformBackend = StubBackend;

// ── Mock backend for testing ──

/// In-memory indicator bus for unit and integration tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// One recorded color command.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Command {
        pub serial: String,
        pub color: Color,
    }

    /// Simulated indicator on the bus.
    #[derive(Debug, Clone)]
    pub struct MockStick {
        pub serial: String,
        pub color: Color,
        /// If true, every command to this stick fails.
        pub fail: bool,
    }

    /// Shared state of the simulated bus.
    #[derive(Debug, Default)]
    pub struct MockBus {
        pub sticks: Vec<MockStick>,
        /// Every successful command, in order.
        pub commands: Vec<Command>,
        /// If true, `find_all` returns an error.
        pub fail_enumeration: bool,
        /// Number of `find_all` calls.
        pub enumerations: usize,
    }

    /// Backend over a [`MockBus`]. Clones share the same bus.
    #[derive(Debug, Clone, Default)]
    pub struct MockBackend {
        pub bus: Rc<RefCell<MockBus>>,
    }

    impl MockBackend {
        /// A bus with a single stick, serial `MOCK0001`.
        pub fn new() -> Self {
            Self::with_serials(&["MOCK0001"])
        }

        pub fn with_serials(serials: &[&str]) -> Self {
            let backend = MockBackend::default();
            for serial in serials {
                backend.plug(serial);
            }
            backend
        }

        pub fn plug(&self, serial: &str) {
            self.bus.borrow_mut().sticks.push(MockStick {
                serial: serial.to_string(),
                color: Color::OFF,
                fail: false,
            });
        }

        pub fn unplug(&self, serial: &str) {
            self.bus.borrow_mut().sticks.retain(|s| s.serial != serial);
        }

        pub fn set_failing(&self, serial: &str, fail: bool) {
            if let Some(stick) = self
                .bus
                .borrow_mut()
                .sticks
                .iter_mut()
                .find(|s| s.serial == serial)
            {
                stick.fail = fail;
            }
        }

        /// Current color of a stick, if it is plugged in.
        pub fn color_of(&self, serial: &str) -> Option<Color> {
            self.bus
                .borrow()
                .sticks
                .iter()
                .find(|s| s.serial == serial)
                .map(|s| s.color)
        }

        /// Colors sent so far, across all sticks.
        pub fn colors(&self) -> Vec<Color> {
            self.bus.borrow().commands.iter().map(|c| c.color).collect()
        }

        /// Colors sent so far to one stick.
        pub fn colors_for(&self, serial: &str) -> Vec<Color> {
            self.bus
                .borrow()
                .commands
                .iter()
                .filter(|c| c.serial == serial)
                .map(|c| c.color)
                .collect()
        }

        pub fn clear_commands(&self) {
            self.bus.borrow_mut().commands.clear();
        }
    }

    /// Handle to one stick on a [`MockBus`].
    pub struct MockDevice {
        serial: String,
        bus: Rc<RefCell<MockBus>>,
    }

    impl IndicatorDevice for MockDevice {
        fn serial(&self) -> &str {
            &self.serial
        }

        fn set_color(&self, color: Color) -> Result<()> {
            let mut bus = self.bus.borrow_mut();
            let stick = bus
                .sticks
                .iter_mut()
                .find(|s| s.serial == self.serial)
                .ok_or_else(|| {
                    DeviceError::OpenFailed(format!("mock: {} unplugged", self.serial))
                })?;
            if stick.fail {
                return Err(DeviceError::CommandFailed(format!(
                    "mock: failure injected on {}",
                    self.serial
                )));
            }
            stick.color = color;
            bus.commands.push(Command {
                serial: self.serial.clone(),
                color,
            });
            Ok(())
        }
    }

    impl DeviceBackend for MockBackend {
        type Device = MockDevice;

        fn find_all(&self) -> Result<Vec<MockDevice>> {
            let mut bus = self.bus.borrow_mut();
            bus.enumerations += 1;
            if bus.fail_enumeration {
                return Err(DeviceError::EnumerationFailed(
                    "mock: enumeration failure injected".into(),
                ));
            }
            Ok(bus
                .sticks
                .iter()
                .map(|s| MockDevice {
                    serial: s.serial.clone(),
                    bus: Rc::clone(&self.bus),
                })
                .collect())
        }
    }
}
