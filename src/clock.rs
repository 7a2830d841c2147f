//! Monotonic tick source.

use embassy_time::{Duration, Instant};

/// Source of the current time for the scheduler.
///
/// Implementations must be monotonic. The firmware reads the embassy time
/// driver (RTC backed, keeps counting in STOP mode).
pub trait Clock {
    fn now(&self) -> Instant;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Adds `delta` to `at`, parking at [`Instant::MAX`] instead of overflowing.
pub fn saturating_add(at: Instant, delta: Duration) -> Instant {
    if delta == Duration::MAX {
        return Instant::MAX;
    }
    at.checked_add(delta).unwrap_or(Instant::MAX)
}
