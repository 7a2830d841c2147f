//! Firmware for the battery-powered wireless weather node.
//!
//! # Overview
//!
//! The node sits outdoors on a pair of AAA cells and reports to a radio
//! gateway. This binary binds the hardware-independent application in the
//! `meteo_node` library to the STM32L083 peripherals:
//! - Battery voltage sampled once an hour through a gated divider
//! - Charge level and low/critical alarms published on the radio link
//! - Temperature, humidity, illuminance and pressure packed and published
//!   every two minutes
//! - Cooperative scheduler idling in STOP mode between runs
//!
//! # Hardware
//!
//! - **MCU**: STM32L083CZ (Cortex-M0+, ultra-low-power)
//! - **Battery**: mini pack, 2x AAA
//! - **RTC**: 32.768 kHz crystal for timekeeping in STOP mode
//!
//! # Low Power Operation
//!
//! - MSI oscillator at 2.097 MHz for the core, HSI16 for the ADC only
//! - The dispatch loop waits on an RTC timer or an ADC completion, so the
//!   embassy executor enters STOP mode whenever nothing is due
//!
//! # Module Organization
//!
//! - [`hardware`] - Pin mappings and peripheral initialization
//! - [`power`] - Sense divider gating, clock and low-power idle
//! - [`analog`] - Async ADC task and completion inbox
//! - [`radio`] - Publication sink
//! - [`sensors`] - Climate module driver

#![no_std]
#![no_main]

mod analog;
mod hardware;
mod power;
mod radio;
mod sensors;

use embassy_executor::Spawner;
use embassy_stm32::i2c::I2c;
use embassy_stm32::mode::Blocking;
use embassy_stm32::{
    Config,
    rcc::{LsConfig, LseConfig, mux::ClockMux},
    time::Hertz,
};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Delay, Timer};
use meteo_node::application::Application;
use meteo_node::config::{INBOX_DEPTH, MAX_TASKS};
use meteo_node::runtime::Runtime;
use {defmt_rtt as _, panic_probe as _};

use analog::{AsyncAdc, INBOX, adc_task};
use hardware::Board;
use power::{RtcClock, SensePin, StopMode};
use radio::RttRadio;
use sensors::ClimateModule;

type Node = Application<SensePin, AsyncAdc, Delay, ClimateModule<I2c<'static, Blocking>, Delay>, RttRadio>;

/// Creates a low-power clock configuration for STM32L083.
///
/// # Clock Settings
///
/// - **MSI**: 2.097 MHz system clock (no PLL)
/// - **HSI16**: enabled as the ADC kernel clock
/// - **LSE**: 32.768 kHz external crystal for RTC
/// - **Voltage scale**: Range 1
///
/// # Returns
///
/// Configured RCC settings for embassy-stm32 initialization
fn create_low_power_config() -> embassy_stm32::rcc::Config {
    embassy_stm32::rcc::Config {
        msi: Some(embassy_stm32::rcc::MSIRange::RANGE2M),
        hsi: true,
        hse: None,
        pll: None,
        sys: embassy_stm32::rcc::Sysclk::MSI,
        ahb_pre: embassy_stm32::rcc::AHBPrescaler::DIV1,
        apb1_pre: embassy_stm32::rcc::APBPrescaler::DIV1,
        apb2_pre: embassy_stm32::rcc::APBPrescaler::DIV1,
        ls: LsConfig {
            rtc: embassy_stm32::rcc::RtcClockSource::LSE,
            lsi: false,
            lse: Some(LseConfig {
                frequency: Hertz::hz(32768),
                mode: embassy_stm32::rcc::LseMode::Oscillator(embassy_stm32::rcc::LseDrive::Low),
            }),
        },
        voltage_scale: embassy_stm32::rcc::VoltageScale::RANGE1,
        mux: ClockMux::default(),
    }
}

/// Main entry point for the sensor node firmware.
///
/// # Initialization Sequence
///
/// 1. Configure clocks for low power operation
/// 2. Initialize STM32 peripherals and the board
/// 3. Spawn the ADC task
/// 4. Register the application with the scheduler (first battery
///    measurement starts here, first climate update is due immediately)
/// 5. Enter the dispatch loop
///
/// Registration failures are configuration errors and panic.
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let mut config = Config::default();
    config.rcc = create_low_power_config();

    let p = embassy_stm32::init(config);

    #[cfg(feature = "debug-mode")]
    defmt::info!("Sensor node firmware starting...");

    // Wait 3 seconds after boot to allow debugger connection
    // before entering STOP mode. Negligible battery impact.
    #[cfg(feature = "debug-mode")]
    defmt::info!("Waiting 3 seconds for debugger connection...");

    Timer::after_secs(3).await;

    let board = Board::new(p);

    #[cfg(feature = "debug-mode")]
    defmt::info!("Spawning ADC task...");

    spawner.spawn(adc_task(board.adc, board.battery_pin)).unwrap();

    let mut runtime: Runtime<'static, Node, RtcClock, CriticalSectionRawMutex, MAX_TASKS, INBOX_DEPTH> =
        Runtime::new(RtcClock, &INBOX);

    let sensors = ClimateModule::new(board.i2c, Delay);
    let mut node = Node::new(board.sense, AsyncAdc, Delay, sensors, RttRadio, &mut runtime).unwrap();

    #[cfg(feature = "debug-mode")]
    defmt::info!("Entering dispatch loop...");

    runtime.run_forever(&mut node, &mut StopMode).await
}
