//! Node application: battery and climate monitoring bridged to the radio.
//!
//! The node runs on the mini battery pack. It reports the battery once an
//! hour: every battery event publishes the current voltage and charge level,
//! and level events additionally raise the battery alarm (`1` when low, `0`
//! when critical). Every two minutes the climate sensors are read and a
//! packed [`ClimateReading`](crate::climate::ClimateReading) payload is sent.
//! The node pairs with the gateway once at start-up.

use embedded_hal::blocking::delay::DelayMs;

use crate::Error;
use crate::adc::Analog;
use crate::battery::{BatteryEvent, BatteryMonitor, FormFactor, SenseGate};
use crate::climate::{Climate, ClimateEvent, ClimateMonitor};
use crate::config::{
    BATTERY_UPDATE_INTERVAL, CLIMATE_UPDATE_INTERVAL, FIRMWARE_VERSION, NODE_NAME,
};
use crate::runtime::Registry;
use crate::telemetry::{Publish, TOPIC_BATTERY_ALARM, TOPIC_BATTERY_PERCENT};

/// Battery monitor as owned by the [`Application`].
pub type Battery<G, A, D, S, R> = BatteryMonitor<Application<G, A, D, S, R>, G, A, D>;

/// Climate monitor as owned by the [`Application`].
pub type ClimateSensors<G, A, D, S, R> = ClimateMonitor<Application<G, A, D, S, R>, S>;

/// Application context handed to every task and completion handler.
pub struct Application<G, A, D, S, R> {
    pub battery: Battery<G, A, D, S, R>,
    pub climate: ClimateSensors<G, A, D, S, R>,
    pub radio: R,
}

impl<G, A, D, S, R> AsMut<Battery<G, A, D, S, R>> for Application<G, A, D, S, R> {
    fn as_mut(&mut self) -> &mut Battery<G, A, D, S, R> {
        &mut self.battery
    }
}

impl<G, A, D, S, R> AsMut<ClimateSensors<G, A, D, S, R>> for Application<G, A, D, S, R> {
    fn as_mut(&mut self) -> &mut ClimateSensors<G, A, D, S, R> {
        &mut self.climate
    }
}

impl<G, A, D, S, R> Application<G, A, D, S, R>
where
    G: SenseGate,
    A: Analog,
    D: DelayMs<u32>,
    S: Climate,
    R: Publish,
{
    /// Brings up both monitors, starts the first battery measurement, makes
    /// the first climate update due and sends the pairing request.
    ///
    /// # Arguments
    ///
    /// * `gate` - Battery sense divider switch
    /// * `adc` - Converter for the battery divider
    /// * `delay` - Blocking delay for the divider settling time
    /// * `sensors` - Climate sensor suite
    /// * `radio` - Publication sink
    /// * `registry` - Runtime the components register with
    ///
    /// # Errors
    ///
    /// [`Error::SchedulerFull`] if the runtime cannot hold both tasks.
    pub fn new(
        gate: G,
        adc: A,
        delay: D,
        sensors: S,
        mut radio: R,
        registry: &mut impl Registry<Self>,
    ) -> Result<Self, Error> {
        let mut battery = BatteryMonitor::new(FormFactor::Mini, gate, adc, delay, registry)?;
        battery.set_event_handler(Self::on_battery_event);
        battery.set_update_interval(Some(BATTERY_UPDATE_INTERVAL), registry.planner());

        let mut climate = ClimateMonitor::new(sensors, registry)?;
        climate.set_event_handler(Self::on_climate_event);
        climate.set_update_interval(Some(CLIMATE_UPDATE_INTERVAL), registry.planner());

        #[cfg(feature = "debug-mode")]
        defmt::info!(
            "battery: {} pack, every {} s, thresholds {}",
            battery.form_factor(),
            battery.update_interval().map(|i| i.as_secs()),
            battery.thresholds()
        );
        #[cfg(feature = "debug-mode")]
        defmt::info!(
            "climate: every {} s",
            climate.update_interval().map(|i| i.as_secs())
        );

        radio.pairing_request(NODE_NAME, FIRMWARE_VERSION);

        Ok(Self {
            battery,
            climate,
            radio,
        })
    }

    fn on_battery_event(app: &mut Self, event: BatteryEvent) {
        if let Some(voltage) = app.battery.voltage() {
            app.radio.publish_battery(voltage);
        }

        if let Some(percentage) = app.battery.charge_level() {
            app.radio.publish_int(TOPIC_BATTERY_PERCENT, percentage);
        }

        match event {
            BatteryEvent::LevelLow => app.radio.publish_int(TOPIC_BATTERY_ALARM, 1),
            BatteryEvent::LevelCritical => app.radio.publish_int(TOPIC_BATTERY_ALARM, 0),
            BatteryEvent::Update => {}
        }
    }

    /// Publishes the packed reading after a complete update. A failed update
    /// sends nothing; the next period tries again.
    fn on_climate_event(app: &mut Self, event: ClimateEvent) {
        if event != ClimateEvent::Update {
            return;
        }

        if let Some(reading) = app.climate.reading() {
            #[cfg(feature = "debug-mode")]
            defmt::debug!("climate: {}", reading);

            app.radio.publish_buffer(&reading.to_payload());
        }
    }
}
