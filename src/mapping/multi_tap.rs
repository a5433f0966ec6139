//! Tap-prefixed pinches
//!
//! A pinch that starts right after a double tap, or after a one-finger tap
//! (the "1.5-finger tap"), is re-flagged so a preset can give it its own
//! meaning. The tap kind is sampled once when the pinch begins and holds
//! until it ends.

use super::MapContext;
use crate::event::{Event, EventFlags, Phase};
use serde::{Deserialize, Serialize};

/// Settings of [`MultiTapMapping`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiTapSettings {
    pub one_and_a_half_tap_flags: EventFlags,
    pub double_tap_flags: EventFlags,
}

impl Default for MultiTapSettings {
    fn default() -> Self {
        Self {
            one_and_a_half_tap_flags: EventFlags::ALTERNATE,
            double_tap_flags: EventFlags::COMMAND,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Latch {
    #[default]
    None,
    OneAndAHalfTap,
    DoubleTap,
}

/// Re-flags pinches that follow a tap
#[derive(Debug, Clone)]
pub struct MultiTapMapping {
    settings: MultiTapSettings,
    latch: Latch,
}

impl MultiTapMapping {
    pub fn new(settings: MultiTapSettings) -> Self {
        Self {
            settings,
            latch: Latch::None,
        }
    }

    pub fn settings(&self) -> &MultiTapSettings {
        &self.settings
    }

    pub fn map(&mut self, mut event: Event, ctx: &MapContext<'_>) -> Vec<Event> {
        if !event.is_magnify() {
            return vec![event];
        }

        if event.phase == Phase::Began {
            self.latch = if ctx.sensor.is_one_and_a_half_tap() {
                Latch::OneAndAHalfTap
            } else if ctx.sensor.is_double_tap() {
                Latch::DoubleTap
            } else {
                Latch::None
            };
        }

        match self.latch {
            Latch::OneAndAHalfTap => event.flags = self.settings.one_and_a_half_tap_flags,
            Latch::DoubleTap => event.flags = self.settings.double_tap_flags,
            Latch::None => {}
        }

        // the ended event still belongs to the gesture
        if event.phase == Phase::Ended {
            self.latch = Latch::None;
        }

        vec![event]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::synth;
    use crate::event::EventType;
    use crate::sensor::StaticSensor;
    use crate::time::timebase::Timestamp;

    fn ctx(sensor: &StaticSensor) -> MapContext<'_> {
        MapContext {
            sensor,
            now: Timestamp::default(),
        }
    }

    #[test]
    fn test_double_tap_latched_for_whole_gesture() {
        let sensor = StaticSensor::new();
        sensor.set_double_tap(true);
        let mut mapping = MultiTapMapping::new(MultiTapSettings::default());

        let out = mapping.map(synth::magnify(0.1, Phase::Began), &ctx(&sensor));
        assert_eq!(out[0].flags, EventFlags::COMMAND);

        sensor.set_double_tap(false);
        let out = mapping.map(synth::magnify(0.1, Phase::Changed), &ctx(&sensor));
        assert_eq!(out[0].flags, EventFlags::COMMAND);
        let out = mapping.map(synth::magnify(0.0, Phase::Ended), &ctx(&sensor));
        assert_eq!(out[0].flags, EventFlags::COMMAND);

        // next gesture starts clean
        let out = mapping.map(synth::magnify(0.1, Phase::Began), &ctx(&sensor));
        assert_eq!(out[0].flags, EventFlags::empty());
    }

    #[test]
    fn test_one_and_a_half_tap_wins() {
        let sensor = StaticSensor::new();
        sensor.set_double_tap(true);
        sensor.set_one_and_a_half_tap(true);
        let mut mapping = MultiTapMapping::new(MultiTapSettings::default());

        let out = mapping.map(synth::magnify(0.1, Phase::Began), &ctx(&sensor));
        assert_eq!(out[0].flags, EventFlags::ALTERNATE);
    }

    #[test]
    fn test_plain_pinch_and_other_events_untouched() {
        let sensor = StaticSensor::new();
        let mut mapping = MultiTapMapping::new(MultiTapSettings::default());

        let mut pinch = synth::magnify(0.1, Phase::Began);
        pinch.flags = EventFlags::SHIFT;
        assert_eq!(mapping.map(pinch.clone(), &ctx(&sensor)), vec![pinch]);

        sensor.set_double_tap(true);
        let scroll = Event::new(EventType::ScrollWheel, Timestamp::default());
        assert_eq!(mapping.map(scroll.clone(), &ctx(&sensor)), vec![scroll]);
    }
}
