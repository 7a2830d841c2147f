//! Host-side stand-ins for the node's capabilities.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::vec::Vec;

use embassy_time::Instant;
use embedded_hal::blocking::delay::DelayMs;

use crate::adc::{AdcChannel, Analog};
use crate::battery::SenseGate;
use crate::climate::{Climate, ClimateReading};
use crate::clock::Clock;
use crate::telemetry::Publish;

/// Clock advanced by hand.
#[derive(Default)]
pub struct ManualClock {
    millis: Cell<u64>,
}

impl ManualClock {
    pub fn at(millis: u64) -> Self {
        Self {
            millis: Cell::new(millis),
        }
    }

    pub fn set(&self, at: Instant) {
        self.millis.set(at.as_millis());
    }

    pub fn advance(&self, millis: u64) {
        self.millis.set(self.millis.get() + millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.millis.get())
    }
}

/// Hardware operation seen by one of the fakes below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwOp {
    Level(bool),
    Output,
    Analog,
    Delay(u32),
    Request(AdcChannel),
}

/// Operation log shared between fakes, in call order.
pub type Trace = Rc<RefCell<Vec<HwOp>>>;

/// Sense gate recording every operation. Clones share the record.
#[derive(Clone, Default)]
pub struct FakeGate(pub Trace);

impl SenseGate for FakeGate {
    fn set_level(&mut self, high: bool) {
        self.0.borrow_mut().push(HwOp::Level(high));
    }

    fn set_output_mode(&mut self) {
        self.0.borrow_mut().push(HwOp::Output);
    }

    fn set_analog_mode(&mut self) {
        self.0.borrow_mut().push(HwOp::Analog);
    }
}

/// Blocking delay that only records the requested time.
#[derive(Clone, Default)]
pub struct RecordingDelay(pub Trace);

impl DelayMs<u32> for RecordingDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.0.borrow_mut().push(HwOp::Delay(ms));
    }
}

#[derive(Default)]
pub struct AdcState {
    pub requests: usize,
    pub result: Option<f32>,
    pub trace: Trace,
}

/// Converter that counts requests and returns a preset result.
#[derive(Clone, Default)]
pub struct FakeAdc(pub Rc<RefCell<AdcState>>);

impl FakeAdc {
    /// Converter logging its requests into `trace`.
    pub fn traced(trace: &Trace) -> Self {
        Self(Rc::new(RefCell::new(AdcState {
            trace: trace.clone(),
            ..AdcState::default()
        })))
    }
}

impl Analog for FakeAdc {
    fn request(&mut self, channel: AdcChannel) {
        let mut state = self.0.borrow_mut();
        state.requests += 1;
        state.trace.borrow_mut().push(HwOp::Request(channel));
    }

    fn read_result(&mut self, _: AdcChannel) -> Option<f32> {
        self.0.borrow().result
    }
}

#[derive(Default)]
pub struct ClimateState {
    pub updates: usize,
    pub reading: Option<ClimateReading>,
}

/// Sensor suite returning a preset reading; `None` makes every update fail.
#[derive(Clone, Default)]
pub struct FakeClimate(pub Rc<RefCell<ClimateState>>);

impl FakeClimate {
    fn field(&self, pick: fn(&ClimateReading) -> f32) -> Option<f32> {
        self.0.borrow().reading.as_ref().map(pick)
    }
}

impl Climate for FakeClimate {
    fn update(&mut self) -> bool {
        let mut state = self.0.borrow_mut();
        state.updates += 1;
        state.reading.is_some()
    }

    fn temperature_celsius(&self) -> Option<f32> {
        self.field(|r| r.temperature)
    }

    fn humidity_percentage(&self) -> Option<f32> {
        self.field(|r| r.humidity)
    }

    fn illuminance_lux(&self) -> Option<f32> {
        self.field(|r| r.illuminance)
    }

    fn pressure_pascal(&self) -> Option<f32> {
        self.field(|r| r.pressure)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Published {
    Battery(f32),
    Int(&'static str, i32),
    Buffer(Vec<u8>),
    Pairing(&'static str, &'static str),
}

/// Radio that keeps everything it was asked to send.
#[derive(Default)]
pub struct RecordingRadio {
    pub sent: Vec<Published>,
}

impl Publish for RecordingRadio {
    fn publish_battery(&mut self, voltage: f32) {
        self.sent.push(Published::Battery(voltage));
    }

    fn publish_int(&mut self, topic: &'static str, value: i32) {
        self.sent.push(Published::Int(topic, value));
    }

    fn publish_buffer(&mut self, data: &[u8]) {
        self.sent.push(Published::Buffer(data.to_vec()));
    }

    fn pairing_request(&mut self, name: &'static str, version: &'static str) {
        self.sent.push(Published::Pairing(name, version));
    }
}
