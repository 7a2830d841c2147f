//! Battery monitor.
//!
//! The battery voltage is read through a resistive divider that is only
//! powered while a measurement runs. A measurement cycle looks like this:
//!
//! ```text
//! Idle --measure()--> sense powered, settle --> conversion requested
//!   ^                                                   |
//!   |                                            completion (inbox)
//!   +---- sense unpowered, result classified <----------+
//! ```
//!
//! While a conversion is in flight every further [`BatteryMonitor::measure`]
//! is rejected, so there is never more than one request outstanding.
//!
//! The periodic task re-arms itself before it starts a measurement, so a slow
//! or failing conversion never stops the cadence. An implausible or failed
//! reading invalidates the stored voltage and pulls the next run in to
//! [`BATTERY_RETRY_DELAY`](crate::config::BATTERY_RETRY_DELAY).

use embassy_time::{Duration, Instant};
use embedded_hal::blocking::delay::DelayMs;

use crate::Error;
use crate::adc::{AdcChannel, AdcEvent, Analog};
use crate::config::{
    BATTERY_PLAUSIBLE_MAX, BATTERY_PLAUSIBLE_MIN, BATTERY_RETRY_DELAY, BATTERY_SETTLE_MS,
    CELL_VOLTAGE,
};
use crate::runtime::Registry;
use crate::scheduler::{Plan, TaskId};

/// Channel the divider output is wired to.
pub const BATTERY_CHANNEL: AdcChannel = AdcChannel::A0;

/// Battery pack variant the node is fitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "debug-mode", derive(defmt::Format))]
pub enum FormFactor {
    /// 4 x AAA pack, divider gated by driving the sense pin.
    Standard,
    /// 2 x AAA pack, divider gated by switching the sense pin between output
    /// and analog mode.
    Mini,
}

impl FormFactor {
    /// Number of AAA cells in series.
    pub fn cell_count(self) -> u8 {
        match self {
            FormFactor::Standard => 4,
            FormFactor::Mini => 2,
        }
    }

    /// Ratio of the sense divider (pin volts per battery volt).
    fn divider_ratio(self) -> f32 {
        match self {
            FormFactor::Standard => 0.13,
            FormFactor::Mini => 0.33,
        }
    }

    /// Default `(low, critical)` thresholds in volts.
    pub fn default_thresholds(self) -> Thresholds {
        let cells = f32::from(self.cell_count());
        Thresholds {
            low: 1.2 * cells,
            critical: 1.0 * cells,
        }
    }

    /// Battery voltage for a reading of `pin_volts` at the divider output.
    pub fn battery_voltage(self, pin_volts: f32) -> f32 {
        pin_volts * (1.0 / self.divider_ratio())
    }

    /// Charge percentage for `voltage`.
    ///
    /// Clamped at 100 but not at 0: a deeply discharged pack reads negative.
    pub fn charge_level(self, voltage: f32) -> i32 {
        let full = CELL_VOLTAGE * f32::from(self.cell_count());
        // Truncates toward zero.
        let percentage = (100.0 * voltage / full) as i32;
        percentage.min(100)
    }
}

/// Alarm levels in volts. A reading at or below a level triggers it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "debug-mode", derive(defmt::Format))]
pub struct Thresholds {
    pub low: f32,
    pub critical: f32,
}

impl Thresholds {
    fn classify(&self, voltage: f32) -> Option<BatteryEvent> {
        if voltage <= self.critical {
            Some(BatteryEvent::LevelCritical)
        } else if voltage <= self.low {
            Some(BatteryEvent::LevelLow)
        } else {
            None
        }
    }
}

/// Notification delivered to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "debug-mode", derive(defmt::Format))]
pub enum BatteryEvent {
    LevelLow,
    LevelCritical,
    /// A valid reading was stored. Always follows a level event, if any.
    Update,
}

/// Application callback for [`BatteryEvent`]s.
pub type EventHandler<C> = fn(&mut C, BatteryEvent);

/// Power switch of the sense divider.
///
/// Which operations are used depends on the [`FormFactor`].
pub trait SenseGate {
    /// Drives the gate pin high or low.
    fn set_level(&mut self, high: bool);
    /// Turns the gate pin into a push-pull output.
    fn set_output_mode(&mut self);
    /// Turns the gate pin into a floating analog input.
    fn set_analog_mode(&mut self);
}

/// Battery monitor owned by the application context `C`.
///
/// `C` must give access to the monitor through [`AsMut`] so the scheduler
/// task and the completion handler can reach it.
pub struct BatteryMonitor<C, G, A, D> {
    form_factor: FormFactor,
    thresholds: Thresholds,
    voltage: f32,
    valid: bool,
    measuring: bool,
    update_interval: Option<Duration>,
    event_handler: Option<EventHandler<C>>,
    task_id: TaskId,
    gate: G,
    adc: A,
    delay: D,
}

impl<C, G, A, D> BatteryMonitor<C, G, A, D>
where
    C: AsMut<BatteryMonitor<C, G, A, D>>,
    G: SenseGate,
    A: Analog,
    D: DelayMs<u32>,
{
    /// Sets up the sense circuit and registers the periodic task (parked)
    /// and the completion handler of [`BATTERY_CHANNEL`].
    ///
    /// No measurement runs until [`set_update_interval`](Self::set_update_interval)
    /// or [`measure`](Self::measure) is called.
    ///
    /// # Arguments
    ///
    /// * `form_factor` - Fitted battery pack, selects divider and gating
    /// * `gate` - Power switch of the sense divider
    /// * `adc` - Converter the divider output is wired to
    /// * `delay` - Blocking delay for the divider settling time
    /// * `registry` - Runtime the task and completion handler go to
    ///
    /// # Errors
    ///
    /// [`Error::SchedulerFull`] if the task table has no room left.
    pub fn new(
        form_factor: FormFactor,
        gate: G,
        adc: A,
        delay: D,
        registry: &mut impl Registry<C>,
    ) -> Result<Self, Error> {
        let task_id = registry.register_task(Self::run_task, Instant::MAX)?;
        registry.set_adc_handler(BATTERY_CHANNEL, Self::on_conversion);

        let mut monitor = Self {
            form_factor,
            thresholds: form_factor.default_thresholds(),
            voltage: 0.0,
            valid: false,
            measuring: false,
            update_interval: None,
            event_handler: None,
            task_id,
            gate,
            adc,
            delay,
        };

        monitor.power_sense(false);
        match form_factor {
            FormFactor::Standard => monitor.gate.set_output_mode(),
            FormFactor::Mini => monitor.gate.set_level(false),
        }

        Ok(monitor)
    }

    /// Installs the callback notified after every valid reading.
    pub fn set_event_handler(&mut self, handler: EventHandler<C>) {
        self.event_handler = Some(handler);
    }

    /// Sets how often the battery is measured. `None` parks the task.
    ///
    /// A finite interval also starts a measurement right away.
    pub fn set_update_interval(&mut self, interval: Option<Duration>, plan: &mut dyn Plan) {
        self.update_interval = interval;

        match interval {
            None => plan.plan_absolute(self.task_id, Instant::MAX),
            Some(interval) => {
                plan.plan_relative(self.task_id, interval);
                self.measure();
            }
        }
    }

    /// Replaces the alarm levels.
    ///
    /// # Arguments
    ///
    /// * `low` - Battery volts at or below which [`BatteryEvent::LevelLow`] fires
    /// * `critical` - Battery volts at or below which [`BatteryEvent::LevelCritical`]
    ///   fires instead
    pub fn set_threshold_levels(&mut self, low: f32, critical: f32) {
        self.thresholds = Thresholds { low, critical };
    }

    /// Starts a measurement now.
    ///
    /// Returns `false` without touching anything if one is already running.
    pub fn measure(&mut self) -> bool {
        if self.measuring {
            return false;
        }

        self.measuring = true;
        self.power_sense(true);
        self.adc.request(BATTERY_CHANNEL);

        #[cfg(feature = "debug-mode")]
        defmt::debug!("battery: conversion requested");

        true
    }

    /// Last valid battery voltage.
    pub fn voltage(&self) -> Option<f32> {
        self.valid.then_some(self.voltage)
    }

    /// Charge level in percent derived from the last valid voltage.
    pub fn charge_level(&self) -> Option<i32> {
        self.voltage()
            .map(|voltage| self.form_factor.charge_level(voltage))
    }

    /// Whether a conversion is in flight.
    pub fn is_measuring(&self) -> bool {
        self.measuring
    }

    pub fn form_factor(&self) -> FormFactor {
        self.form_factor
    }

    /// Alarm levels currently in use.
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn update_interval(&self) -> Option<Duration> {
        self.update_interval
    }

    pub(crate) fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Periodic task: re-arm first, then measure.
    fn run_task(ctx: &mut C, plan: &mut dyn Plan) {
        let monitor = ctx.as_mut();

        match monitor.update_interval {
            None => plan.plan_absolute(monitor.task_id, Instant::MAX),
            Some(interval) => plan.plan_current_relative(interval),
        }

        monitor.measure();
    }

    /// Completion handler of [`BATTERY_CHANNEL`].
    fn on_conversion(ctx: &mut C, event: AdcEvent, plan: &mut dyn Plan) {
        let monitor = ctx.as_mut();
        let Some(level) = monitor.complete(event, plan) else {
            return;
        };
        let Some(handler) = monitor.event_handler else {
            return;
        };

        if let Some(level) = level {
            handler(ctx, level);
        }
        handler(ctx, BatteryEvent::Update);
    }

    /// Consumes a conversion result.
    ///
    /// Returns `None` if nothing should be notified, otherwise the level event
    /// (if any) that precedes [`BatteryEvent::Update`].
    fn complete(&mut self, event: AdcEvent, plan: &mut dyn Plan) -> Option<Option<BatteryEvent>> {
        if !self.measuring {
            #[cfg(feature = "debug-mode")]
            defmt::warn!("battery: completion without a pending conversion");
            return None;
        }

        let reading = match event {
            AdcEvent::Done => self.adc.read_result(BATTERY_CHANNEL),
            AdcEvent::Error => None,
        };

        self.power_sense(false);
        self.measuring = false;

        let voltage = reading
            .map(|pin_volts| self.form_factor.battery_voltage(pin_volts))
            .filter(|voltage| (BATTERY_PLAUSIBLE_MIN..=BATTERY_PLAUSIBLE_MAX).contains(voltage));

        let Some(voltage) = voltage else {
            #[cfg(feature = "debug-mode")]
            defmt::warn!("battery: reading rejected, retrying");

            self.valid = false;
            plan.plan_relative(self.task_id, BATTERY_RETRY_DELAY);
            return None;
        };

        #[cfg(feature = "debug-mode")]
        defmt::debug!("battery: {} V", voltage);

        self.voltage = voltage;
        self.valid = true;

        Some(self.thresholds.classify(voltage))
    }

    fn power_sense(&mut self, enable: bool) {
        match self.form_factor {
            FormFactor::Mini if enable => self.gate.set_output_mode(),
            FormFactor::Mini => self.gate.set_analog_mode(),
            FormFactor::Standard => self.gate.set_level(enable),
        }

        if enable {
            self.delay.delay_ms(BATTERY_SETTLE_MS);
        }
    }
}
