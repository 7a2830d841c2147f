//! Climate sensors: temperature, relative humidity, illuminance and
//! barometric pressure.
//!
//! The sensor suite sits behind the [`Climate`] capability. A
//! [`ClimateMonitor`] owns it and runs one blocking update per period from a
//! scheduler task, then tells the application whether fresh values are
//! available. The application ships them as a compact [`ClimateReading::to_payload`]
//! buffer.

use embassy_time::{Duration, Instant};

use crate::Error;
use crate::runtime::Registry;
use crate::scheduler::{Plan, TaskId};

/// Size of the packed climate payload.
pub const PAYLOAD_LEN: usize = 7;

/// Pressure offset of the payload, in hPa.
const PRESSURE_OFFSET_HPA: f32 = 900.0;

/// Climate sensor suite.
///
/// Accessors return the value of the last successful [`update`](Self::update),
/// `None` if that sensor has never produced one.
pub trait Climate {
    /// Measures every sensor once. Returns `false` if any of them failed.
    fn update(&mut self) -> bool;

    fn temperature_celsius(&self) -> Option<f32>;

    fn humidity_percentage(&self) -> Option<f32>;

    fn illuminance_lux(&self) -> Option<f32>;

    fn pressure_pascal(&self) -> Option<f32>;
}

/// One complete set of climate values.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "debug-mode", derive(defmt::Format))]
pub struct ClimateReading {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Percent relative humidity.
    pub humidity: f32,
    /// Lux.
    pub illuminance: f32,
    /// Pascal.
    pub pressure: f32,
}

impl ClimateReading {
    /// Packs the reading into the radio payload.
    ///
    /// Little-endian layout, every field truncated toward zero and saturated
    /// to its type:
    ///
    /// | Bytes | Field | Encoding |
    /// |---|---|---|
    /// | 0..2 | temperature | `i16`, hundredths of a degree |
    /// | 2 | humidity | `u8`, percent |
    /// | 3..5 | illuminance | `u16`, lux |
    /// | 5..7 | pressure | `u16`, hundredths of a hPa above 900 hPa |
    pub fn to_payload(&self) -> [u8; PAYLOAD_LEN] {
        let temperature = (self.temperature * 100.0) as i16;
        let humidity = self.humidity as u8;
        let illuminance = self.illuminance as u16;
        let pressure = ((self.pressure / 100.0 - PRESSURE_OFFSET_HPA) * 100.0) as u16;

        let mut payload = [0; PAYLOAD_LEN];
        payload[0..2].copy_from_slice(&temperature.to_le_bytes());
        payload[2] = humidity;
        payload[3..5].copy_from_slice(&illuminance.to_le_bytes());
        payload[5..7].copy_from_slice(&pressure.to_le_bytes());
        payload
    }
}

/// Outcome of one climate update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "debug-mode", derive(defmt::Format))]
pub enum ClimateEvent {
    /// Every sensor produced a fresh value.
    Update,
    /// At least one sensor failed; values of the others are still updated.
    Error,
}

/// Application callback for [`ClimateEvent`]s.
pub type ClimateHandler<C> = fn(&mut C, ClimateEvent);

/// Periodic driver of a [`Climate`] suite, owned by the application context `C`.
pub struct ClimateMonitor<C, S> {
    sensors: S,
    update_interval: Option<Duration>,
    event_handler: Option<ClimateHandler<C>>,
    task_id: TaskId,
}

impl<C, S> ClimateMonitor<C, S>
where
    C: AsMut<ClimateMonitor<C, S>>,
    S: Climate,
{
    /// Registers the update task, parked.
    ///
    /// # Arguments
    ///
    /// * `sensors` - Sensor suite to drive
    /// * `registry` - Runtime the update task is registered with
    ///
    /// # Errors
    ///
    /// [`Error::SchedulerFull`] if the task table has no room left.
    pub fn new(sensors: S, registry: &mut impl Registry<C>) -> Result<Self, Error> {
        let task_id = registry.register_task(Self::run_task, Instant::MAX)?;

        Ok(Self {
            sensors,
            update_interval: None,
            event_handler: None,
            task_id,
        })
    }

    /// Installs the callback notified after every update.
    pub fn set_event_handler(&mut self, handler: ClimateHandler<C>) {
        self.event_handler = Some(handler);
    }

    /// Sets the update period. `None` parks the task.
    ///
    /// A finite interval makes the first update due immediately; the next
    /// ones follow every `interval` from there.
    pub fn set_update_interval(&mut self, interval: Option<Duration>, plan: &mut dyn Plan) {
        self.update_interval = interval;

        match interval {
            None => plan.plan_absolute(self.task_id, Instant::MAX),
            Some(_) => {
                let now = plan.now();
                plan.plan_absolute(self.task_id, now);
            }
        }
    }

    /// Latest complete reading, `None` while any sensor has no value.
    pub fn reading(&self) -> Option<ClimateReading> {
        Some(ClimateReading {
            temperature: self.sensors.temperature_celsius()?,
            humidity: self.sensors.humidity_percentage()?,
            illuminance: self.sensors.illuminance_lux()?,
            pressure: self.sensors.pressure_pascal()?,
        })
    }

    pub fn update_interval(&self) -> Option<Duration> {
        self.update_interval
    }

    pub(crate) fn task_id(&self) -> TaskId {
        self.task_id
    }

    fn run_task(ctx: &mut C, plan: &mut dyn Plan) {
        let monitor = ctx.as_mut();

        match monitor.update_interval {
            None => plan.plan_absolute(monitor.task_id, Instant::MAX),
            Some(interval) => plan.plan_current_relative(interval),
        }

        let event = if monitor.sensors.update() {
            ClimateEvent::Update
        } else {
            #[cfg(feature = "debug-mode")]
            defmt::warn!("climate: update failed");

            ClimateEvent::Error
        };

        if let Some(handler) = monitor.event_handler {
            handler(ctx, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embassy_sync::channel::Channel;

    use super::*;
    use crate::adc::Inbox;
    use crate::runtime::Runtime;
    use crate::testing::{FakeClimate, ManualClock};

    type Monitor = ClimateMonitor<Node, FakeClimate>;

    struct Node {
        climate: Monitor,
        events: Vec<ClimateEvent>,
    }

    impl AsMut<Monitor> for Node {
        fn as_mut(&mut self) -> &mut Monitor {
            &mut self.climate
        }
    }

    fn record(node: &mut Node, event: ClimateEvent) {
        node.events.push(event);
    }

    fn reading() -> ClimateReading {
        ClimateReading {
            temperature: 21.5,
            humidity: 45.9,
            illuminance: 812.7,
            pressure: 101_325.0,
        }
    }

    fn setup<'a>(
        clock: &'a ManualClock,
        inbox: &'a Inbox<NoopRawMutex, 4>,
        sensors: &FakeClimate,
    ) -> (Runtime<'a, Node, &'a ManualClock, NoopRawMutex, 4, 4>, Node) {
        let mut runtime = Runtime::new(clock, inbox);
        let mut climate = Monitor::new(sensors.clone(), &mut runtime).unwrap();
        climate.set_event_handler(record);
        let node = Node {
            climate,
            events: Vec::new(),
        };
        (runtime, node)
    }

    #[test]
    fn payload_layout() {
        assert_eq!(
            reading().to_payload(),
            [0x66, 0x08, 45, 0x2C, 0x03, 0x3D, 0x2C]
        );
    }

    #[test]
    fn payload_fields_truncate() {
        let payload = ClimateReading {
            temperature: -3.25,
            humidity: 99.99,
            illuminance: 0.9,
            pressure: 95_000.0,
        }
        .to_payload();

        assert_eq!(i16::from_le_bytes([payload[0], payload[1]]), -325);
        assert_eq!(payload[2], 99);
        assert_eq!(u16::from_le_bytes([payload[3], payload[4]]), 0);
        assert_eq!(u16::from_le_bytes([payload[5], payload[6]]), 5000);

        let payload = ClimateReading {
            temperature: 21.567,
            ..reading()
        }
        .to_payload();
        assert_eq!(i16::from_le_bytes([payload[0], payload[1]]), 2156);
    }

    #[test]
    fn payload_saturates_out_of_range_fields() {
        let payload = ClimateReading {
            temperature: 400.0,
            humidity: 300.0,
            illuminance: 120_000.0,
            pressure: 85_000.0,
        }
        .to_payload();

        assert_eq!(i16::from_le_bytes([payload[0], payload[1]]), i16::MAX);
        assert_eq!(payload[2], u8::MAX);
        assert_eq!(u16::from_le_bytes([payload[3], payload[4]]), u16::MAX);
        // Below the 900 hPa offset.
        assert_eq!(u16::from_le_bytes([payload[5], payload[6]]), 0);
    }

    #[test]
    fn first_update_runs_immediately_then_periodically() {
        let clock = ManualClock::at(7_000);
        let inbox = Channel::new();
        let sensors = FakeClimate::default();
        sensors.0.borrow_mut().reading = Some(reading());
        let (mut runtime, mut node) = setup(&clock, &inbox, &sensors);
        let id = node.climate.task_id();
        assert_eq!(runtime.scheduler().due(id), Some(Instant::MAX));

        node.climate
            .set_update_interval(Some(Duration::from_secs(120)), runtime.scheduler_mut());
        assert_eq!(runtime.scheduler().due(id), Some(Instant::from_millis(7_000)));

        runtime.service(&mut node);
        assert_eq!(sensors.0.borrow().updates, 1);
        assert_eq!(node.events, [ClimateEvent::Update]);
        assert_eq!(node.climate.reading(), Some(reading()));
        assert_eq!(runtime.scheduler().due(id), Some(Instant::from_millis(127_000)));

        // Late dispatch does not shift the cadence.
        clock.set(Instant::from_millis(127_400));
        runtime.service(&mut node);
        assert_eq!(sensors.0.borrow().updates, 2);
        assert_eq!(runtime.scheduler().due(id), Some(Instant::from_millis(247_000)));
    }

    #[test]
    fn failed_update_reports_error_and_keeps_cadence() {
        let clock = ManualClock::at(0);
        let inbox = Channel::new();
        let sensors = FakeClimate::default();
        let (mut runtime, mut node) = setup(&clock, &inbox, &sensors);

        node.climate
            .set_update_interval(Some(Duration::from_secs(120)), runtime.scheduler_mut());
        runtime.service(&mut node);

        assert_eq!(node.events, [ClimateEvent::Error]);
        assert_eq!(node.climate.reading(), None);
        assert_eq!(
            runtime.scheduler().due(node.climate.task_id()),
            Some(Instant::from_millis(120_000))
        );
    }

    #[test]
    fn infinite_interval_parks_the_task() {
        let clock = ManualClock::at(0);
        let inbox = Channel::new();
        let sensors = FakeClimate::default();
        let (mut runtime, mut node) = setup(&clock, &inbox, &sensors);

        node.climate
            .set_update_interval(Some(Duration::from_secs(120)), runtime.scheduler_mut());
        node.climate
            .set_update_interval(None, runtime.scheduler_mut());

        clock.advance(1_000_000);
        runtime.service(&mut node);
        assert_eq!(sensors.0.borrow().updates, 0);
        assert_eq!(node.climate.update_interval(), None);
        assert!(node.events.is_empty());
    }
}
