//! Monotonic timing used for gesture timing windows
//!
//! Timestamps are nanoseconds on a monotonic clock. Raw mach ticks read from
//! Core Graphics events are converted through the timebase before they reach
//! the recognizers.

pub mod timebase;

pub use timebase::{Duration, MachTimebase, Timestamp};
