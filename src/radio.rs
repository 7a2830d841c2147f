//! Radio link stand-in.
//!
//! Publications are written to the RTT log in the gateway's topic format;
//! the sub-GHz framing is handled outside this firmware.

use meteo_node::telemetry::Publish;

pub struct RttRadio;

impl Publish for RttRadio {
    fn publish_battery(&mut self, voltage: f32) {
        defmt::info!("pub battery: {} V", voltage);
    }

    fn publish_int(&mut self, topic: &'static str, value: i32) {
        defmt::info!("pub {}: {}", topic, value);
    }

    fn publish_buffer(&mut self, data: &[u8]) {
        defmt::info!("pub buffer: {=[u8]:x}", data);
    }

    fn pairing_request(&mut self, name: &'static str, version: &'static str) {
        defmt::info!("pairing request: {} v{}", name, version);
    }
}
