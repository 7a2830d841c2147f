//! Outbound telemetry.

/// Topic of the battery charge percentage.
pub const TOPIC_BATTERY_PERCENT: &str = "bat-pct";

/// Topic of the battery alarm: 1 on low level, 0 on critical level.
pub const TOPIC_BATTERY_ALARM: &str = "bat-alarm";

/// Radio link towards the gateway.
///
/// Framing and delivery belong to the radio stack; implementations only
/// have to queue the value for transmission.
pub trait Publish {
    /// Publishes the battery voltage on the dedicated battery channel.
    fn publish_battery(&mut self, voltage: f32);

    /// Publishes an integer under a named topic.
    fn publish_int(&mut self, topic: &'static str, value: i32);

    /// Publishes a raw payload.
    fn publish_buffer(&mut self, data: &[u8]);

    /// Announces the node to the gateway.
    ///
    /// # Arguments
    ///
    /// * `name` - Node name shown by the gateway
    /// * `version` - Firmware version string
    fn pairing_request(&mut self, name: &'static str, version: &'static str);
}
