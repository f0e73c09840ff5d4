//! Indicator colors, broadcast commands and the fixed signal sequences.

mod color;
mod controller;
mod sequence;

pub use color::{Color, format_color, parse_color};
pub use controller::{Broadcast, DeviceController, DeviceOutcome};
pub use sequence::{
    FLASH_HALF_PERIOD, TEST_COLOR_HOLD, TEST_COLORS, UNKNOWN_FLASHES, signal_unknown, test_colors,
};
