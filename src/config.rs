//! Compile-time configuration of the sensor node.

use embassy_time::Duration;

/// Name the node announces itself with when pairing.
pub const NODE_NAME: &str = "METEOSONDA";

/// Firmware version reported when pairing.
pub const FIRMWARE_VERSION: &str = "1";

/// How often the climate sensors are read and published.
pub const CLIMATE_UPDATE_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// How often the application asks for a fresh battery reading.
pub const BATTERY_UPDATE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Retry delay after an implausible or failed battery reading.
///
/// Overrides the configured update interval for the next run.
pub const BATTERY_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Settling time of the battery sense divider after it is powered.
pub const BATTERY_SETTLE_MS: u32 = 100;

/// Plausible battery voltage window in volts (inclusive on both ends).
pub const BATTERY_PLAUSIBLE_MIN: f32 = 0.0;
pub const BATTERY_PLAUSIBLE_MAX: f32 = 10.0;

/// Nominal voltage of a single fresh cell, used for the charge percentage.
pub const CELL_VOLTAGE: f32 = 1.6;

/// ADC reference (VDDA) in volts.
pub const ADC_VREF: f32 = 3.3;

/// Full scale of the 12-bit ADC.
pub const ADC_FULL_SCALE: f32 = 4095.0;

/// Capacity of the scheduler task table.
pub const MAX_TASKS: usize = 8;

/// Depth of the analog completion inbox.
pub const INBOX_DEPTH: usize = 4;
