//! Touch sensing
//!
//! The recognizers ask a [`TouchSensor`] how many fingers rest on the
//! trackpad or on the Magic Mouse surface at the moment an event is
//! processed, and whether the current trackpad contact was preceded by a tap.
//!
//! [`TouchState`] derives those answers from raw contact frames (fed by the
//! MultitouchSupport adapter on macOS). [`StaticSensor`] is a settable
//! snapshot used by replay scripts and tests.

pub mod touch_state;

#[cfg(target_os = "macos")]
pub mod multitouch;

pub use touch_state::TouchState;

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Touch surface a finger count refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    /// Built-in or Magic Trackpad
    Trackpad,
    /// Magic Mouse top surface
    #[default]
    Mousepad,
}

/// Synchronous touch queries used by the gesture recognizers
pub trait TouchSensor: Send + Sync {
    /// Fingers currently touching `surface`
    fn touch_count(&self, surface: Surface) -> u32;

    /// Finger count of the most recent contact, finished or not
    fn last_touch_count(&self) -> u32;

    /// The current trackpad contact is a two-finger touch that began right
    /// after a one-finger tap
    fn is_one_and_a_half_tap(&self) -> bool;

    /// The current trackpad contact began right after a tap with the same
    /// finger count
    fn is_double_tap(&self) -> bool;

    /// System preference "Tap to click" for the trackpad
    fn tap_to_click_enabled(&self) -> bool;
}

/// Sensor whose answers are set explicitly
#[derive(Debug, Default)]
pub struct StaticSensor {
    trackpad: AtomicU32,
    mousepad: AtomicU32,
    last_touch_count: AtomicU32,
    one_and_a_half_tap: AtomicBool,
    double_tap: AtomicBool,
    tap_to_click: AtomicBool,
}

impl StaticSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the finger count of a surface. A non-zero count also becomes the
    /// last touch count.
    pub fn set_touch_count(&self, surface: Surface, count: u32) {
        match surface {
            Surface::Trackpad => self.trackpad.store(count, Ordering::Relaxed),
            Surface::Mousepad => self.mousepad.store(count, Ordering::Relaxed),
        }
        if count > 0 {
            self.last_touch_count.store(count, Ordering::Relaxed);
        }
    }

    pub fn set_last_touch_count(&self, count: u32) {
        self.last_touch_count.store(count, Ordering::Relaxed);
    }

    pub fn set_one_and_a_half_tap(&self, value: bool) {
        self.one_and_a_half_tap.store(value, Ordering::Relaxed);
    }

    pub fn set_double_tap(&self, value: bool) {
        self.double_tap.store(value, Ordering::Relaxed);
    }

    pub fn set_tap_to_click(&self, value: bool) {
        self.tap_to_click.store(value, Ordering::Relaxed);
    }
}

impl TouchSensor for StaticSensor {
    fn touch_count(&self, surface: Surface) -> u32 {
        match surface {
            Surface::Trackpad => self.trackpad.load(Ordering::Relaxed),
            Surface::Mousepad => self.mousepad.load(Ordering::Relaxed),
        }
    }

    fn last_touch_count(&self) -> u32 {
        self.last_touch_count.load(Ordering::Relaxed)
    }

    fn is_one_and_a_half_tap(&self) -> bool {
        self.one_and_a_half_tap.load(Ordering::Relaxed)
    }

    fn is_double_tap(&self) -> bool {
        self.double_tap.load(Ordering::Relaxed)
    }

    fn tap_to_click_enabled(&self) -> bool {
        self.tap_to_click.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_sensor_defaults() {
        let sensor = StaticSensor::new();
        assert_eq!(sensor.touch_count(Surface::Trackpad), 0);
        assert_eq!(sensor.touch_count(Surface::Mousepad), 0);
        assert!(!sensor.is_double_tap());
        assert!(!sensor.tap_to_click_enabled());
    }

    #[test]
    fn test_static_sensor_tracks_last_count() {
        let sensor = StaticSensor::new();
        sensor.set_touch_count(Surface::Trackpad, 3);
        sensor.set_touch_count(Surface::Trackpad, 0);
        assert_eq!(sensor.touch_count(Surface::Trackpad), 0);
        assert_eq!(sensor.last_touch_count(), 3);
    }

    #[test]
    fn test_surface_serialization() {
        assert_eq!(serde_json::to_string(&Surface::Mousepad).unwrap(), r#""mousepad""#);
        let surface: Surface = serde_json::from_str(r#""trackpad""#).unwrap();
        assert_eq!(surface, Surface::Trackpad);
    }
}
