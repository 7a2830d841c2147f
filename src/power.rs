//! Power management of the sensor node.
//!
//! Two concerns live here: gating the battery sense divider, which draws
//! current whenever it is powered, and letting the MCU sleep between
//! dispatch cycles.
//!
//! # Sense Divider
//!
//! On the mini pack the divider hangs off P1 (PA1). Driving the pin as an
//! output closes the divider to ground; switching it to analog mode leaves
//! it floating so no current flows. The standard pack uses the same pin as a
//! plain push-pull enable. The battery monitor picks the operations.
//!
//! # Sleep
//!
//! The idle wait is an embassy timer. With nothing else runnable the
//! executor enters STOP mode and the RTC (LSE) wakes it at the deadline; an
//! ADC completion wakes it earlier through the inbox.

use core::future::Future;

use embassy_stm32::gpio::{Flex, Level, Speed};
use embassy_time::{Instant, Timer};
use meteo_node::battery::SenseGate;
use meteo_node::clock::Clock;
use meteo_node::runtime::Idle;

/// Battery divider gate on a reconfigurable pin.
pub struct SensePin {
    pin: Flex<'static>,
}

impl SensePin {
    pub fn new(pin: Flex<'static>) -> Self {
        Self { pin }
    }
}

impl SenseGate for SensePin {
    fn set_level(&mut self, high: bool) {
        self.pin.set_level(Level::from(high));
    }

    fn set_output_mode(&mut self) {
        self.pin.set_as_output(Speed::Low);
    }

    fn set_analog_mode(&mut self) {
        self.pin.set_as_analog();
    }
}

/// Embassy time driver (RTC backed, keeps running in STOP mode).
pub struct RtcClock;

impl Clock for RtcClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Idle wait that lets the executor drop into STOP mode.
pub struct StopMode;

impl Idle for StopMode {
    fn until(&mut self, at: Instant) -> impl Future<Output = ()> {
        Timer::at(at)
    }
}
