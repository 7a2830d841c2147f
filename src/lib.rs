//! Application layer for a battery-powered wireless sensor node.
//!
//! The node wakes on fixed intervals, samples its sensors and publishes the
//! readings over the radio link. This crate holds the hardware-independent
//! part of that firmware so it can be exercised on the host:
//!
//! - [`scheduler`] - cooperative, time-ordered task queue
//! - [`runtime`] - dispatch loop tying the scheduler to hardware completions
//! - [`adc`] - analog conversion capability and completion inbox
//! - [`battery`] - asynchronous battery measurement state machine
//! - [`climate`] - periodic climate sensor updates and their radio payload
//! - [`telemetry`] - outbound publication capability
//! - [`application`] - wiring of battery and climate events to telemetry
//!
//! The firmware binary (`firmware` feature) binds these capabilities to the
//! STM32L083 peripherals through `embassy-stm32`.

#![cfg_attr(not(test), no_std)]

pub mod adc;
pub mod application;
pub mod battery;
pub mod climate;
pub mod clock;
pub mod config;
pub mod error;
pub mod runtime;
pub mod scheduler;
pub mod telemetry;
#[cfg(test)]
mod testing;

pub use error::Error;
