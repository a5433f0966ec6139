//! Monotonic Timebase
//!
//! Timing windows in the gesture recognizers are measured in nanoseconds.
//! On macOS the hardware counter is `mach_absolute_time`, whose tick length
//! differs between Intel (1 ns) and Apple Silicon (~41.67 ns), so raw ticks
//! read from events are converted through the cached timebase ratio.
//! Other platforms use a process-local `Instant` anchor.

use std::sync::OnceLock;

/// Global timebase info, initialized once at startup
static TIMEBASE_INFO: OnceLock<TimebaseInfo> = OnceLock::new();

/// Cached timebase conversion factors
#[derive(Debug, Clone, Copy)]
struct TimebaseInfo {
    numer: u32,
    denom: u32,
}

#[cfg(not(target_os = "macos"))]
static ANCHOR: OnceLock<std::time::Instant> = OnceLock::new();

fn timebase_info() -> TimebaseInfo {
    *TIMEBASE_INFO.get_or_init(|| {
        #[cfg(target_os = "macos")]
        {
            let mut info = mach2::mach_time::mach_timebase_info_data_t { numer: 0, denom: 0 };
            // Safety: mach_timebase_info is always safe to call
            unsafe {
                mach2::mach_time::mach_timebase_info(&mut info);
            }
            if info.numer == 0 || info.denom == 0 {
                TimebaseInfo { numer: 1, denom: 1 }
            } else {
                TimebaseInfo {
                    numer: info.numer,
                    denom: info.denom,
                }
            }
        }
        #[cfg(not(target_os = "macos"))]
        {
            TimebaseInfo { numer: 1, denom: 1 }
        }
    })
}

/// High-precision monotonic timebase
#[derive(Debug, Clone, Copy)]
pub struct MachTimebase;

impl MachTimebase {
    /// Initialize the timebase. Calling it up front keeps the first event
    /// callback from paying for the `mach_timebase_info` query.
    pub fn init() {
        let _ = timebase_info();
        #[cfg(not(target_os = "macos"))]
        {
            let _ = ANCHOR.get_or_init(std::time::Instant::now);
        }
    }

    /// Current raw counter value.
    #[inline(always)]
    pub fn now_ticks() -> u64 {
        #[cfg(target_os = "macos")]
        {
            // Safety: mach_absolute_time is always safe to call
            unsafe { mach2::mach_time::mach_absolute_time() }
        }
        #[cfg(not(target_os = "macos"))]
        {
            let anchor = ANCHOR.get_or_init(std::time::Instant::now);
            anchor.elapsed().as_nanos() as u64
        }
    }

    /// Convert raw ticks to nanoseconds.
    #[inline]
    pub fn ticks_to_nanos(ticks: u64) -> u64 {
        let info = timebase_info();
        // u128 prevents overflow on large tick counts
        ((ticks as u128 * info.numer as u128) / info.denom as u128) as u64
    }

    /// Current time in nanoseconds since boot (or since the anchor off macOS).
    #[inline]
    pub fn now_nanos() -> u64 {
        Self::ticks_to_nanos(Self::now_ticks())
    }

    /// Get the timebase info for debugging/logging.
    pub fn get_timebase_info() -> (u32, u32) {
        let info = timebase_info();
        (info.numer, info.denom)
    }
}

/// Monotonic point in time, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a timestamp from nanoseconds.
    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Create a timestamp from milliseconds. Mostly useful for scripted input.
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    /// Create a timestamp from raw mach ticks as found in `CGEventGetTimestamp`.
    #[inline]
    pub fn from_ticks(ticks: u64) -> Self {
        Self(MachTimebase::ticks_to_nanos(ticks))
    }

    /// Capture current timestamp.
    #[inline]
    pub fn now() -> Self {
        Self(MachTimebase::now_nanos())
    }

    /// Nanosecond value.
    #[inline]
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Millisecond value.
    #[inline]
    pub const fn as_millis(&self) -> u64 {
        self.0 / 1_000_000
    }

    /// Duration since an earlier timestamp, zero if `earlier` is actually later.
    #[inline]
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }
}

impl serde::Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Timestamp(nanos))
    }
}

/// Span of time in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(u64);

impl Duration {
    /// Zero duration.
    pub const ZERO: Duration = Duration(0);

    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    #[inline]
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn as_millis(&self) -> u64 {
        self.0 / 1_000_000
    }
}
