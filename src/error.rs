/// Errors surfaced while wiring the node together.
///
/// Everything that can fail at steady state is absorbed by the component that
/// owns it (see [`crate::battery`]); only configuration mistakes made during
/// initialization reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "debug-mode", derive(defmt::Format))]
pub enum Error {
    /// The scheduler task table is full.
    SchedulerFull,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::SchedulerFull => f.write_str("scheduler task table is full"),
        }
    }
}
