//! Analog conversion capability.
//!
//! Conversions are asynchronous: [`Analog::request`] starts one and returns
//! immediately, the driver later posts an [`AdcCompletion`] into an [`Inbox`].
//! The inbox is drained by the [`Runtime`](crate::runtime::Runtime), which
//! hands every completion to the handler registered for its channel. A handler
//! therefore always runs on the dispatch loop, never at interrupt priority.

use embassy_sync::channel::Channel;

/// Analog input of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "debug-mode", derive(defmt::Format))]
pub enum AdcChannel {
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
}

impl AdcChannel {
    /// Number of channels, the size of per-channel tables.
    pub const COUNT: usize = 6;

    /// Position of the channel in per-channel tables.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Outcome of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "debug-mode", derive(defmt::Format))]
pub enum AdcEvent {
    Done,
    Error,
}

/// Completion signal posted by the driver once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "debug-mode", derive(defmt::Format))]
pub struct AdcCompletion {
    pub channel: AdcChannel,
    pub event: AdcEvent,
}

impl AdcCompletion {
    pub fn done(channel: AdcChannel) -> Self {
        Self {
            channel,
            event: AdcEvent::Done,
        }
    }

    pub fn error(channel: AdcChannel) -> Self {
        Self {
            channel,
            event: AdcEvent::Error,
        }
    }
}

/// Single-consumer queue of completions.
///
/// Producers (ADC task or interrupt) use `try_send`/`send`; the runtime is the
/// only receiver.
pub type Inbox<M, const Q: usize> = Channel<M, AdcCompletion, Q>;

/// Asynchronous analog-to-digital converter.
pub trait Analog {
    /// Starts a conversion on `channel`. Fire and forget; the result is
    /// announced through the inbox.
    fn request(&mut self, channel: AdcChannel);

    /// Result of the last conversion on `channel` in volts at the pin, `None`
    /// if there is no valid result.
    fn read_result(&mut self, channel: AdcChannel) -> Option<f32>;
}
