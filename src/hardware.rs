//! Hardware abstraction and peripheral initialization.
//!
//! This module defines the pin mappings and peripheral bring-up of the
//! sensor node (STM32L083CZ core board with the mini battery pack).
//!
//! # Pin Assignments
//!
//! ## Battery Sense
//! - **PA0**: A0 - Divider output, ADC channel 0
//! - **PA1**: P1 - Divider gate (output or analog mode, see [`SensePin`])
//!
//! ## Climate Module (I2C1)
//! - **PB6**: SCL
//! - **PB7**: SDA
//!
//! ## Low Power & RTC
//! - **PC14**: OSC32_IN - 32.768 kHz crystal input
//! - **PC15**: OSC32_OUT - 32.768 kHz crystal output
//!
//! ## Debug (SWD)
//! - **PA13**: SWDIO
//! - **PA14**: SWCLK

use embassy_stm32::adc::{self, Adc};
use embassy_stm32::gpio::Flex;
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::mode::Blocking;
use embassy_stm32::peripherals::{ADC1, PA0};
use embassy_stm32::{Peri, bind_interrupts};

use crate::power::SensePin;

bind_interrupts!(pub struct Irqs {
    ADC1_COMP => adc::InterruptHandler<ADC1>;
});

/// Top-level peripheral container for the sensor node.
///
/// Owns the peripherals the application needs; everything else stays in
/// reset state.
pub struct Board {
    /// Battery divider gate
    pub sense: SensePin,
    /// ADC driving the battery conversions
    pub adc: Adc<'static, ADC1>,
    /// Battery divider output
    pub battery_pin: Peri<'static, PA0>,
    /// Bus of the climate sensors (100 kHz, blocking)
    pub i2c: I2c<'static, Blocking>,
}

impl Board {
    /// Initializes the board from the STM32 peripheral singleton.
    ///
    /// The gate pin is left floating here; the battery monitor puts it in
    /// its idle state for the fitted pack during initialization.
    ///
    /// # Arguments
    ///
    /// * `p` - STM32 peripheral singleton from embassy_stm32::init()
    pub fn new(p: embassy_stm32::Peripherals) -> Self {
        Self {
            sense: SensePin::new(Flex::new(p.PA1)),
            adc: Adc::new(p.ADC1, Irqs),
            battery_pin: p.PA0,
            i2c: I2c::new_blocking(p.I2C1, p.PB6, p.PB7, i2c::Config::default()),
        }
    }
}
