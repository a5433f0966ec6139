//! Multi-finger click to middle click
//!
//! A left or right click made while a configured number of fingers rests on
//! the Magic Mouse or the trackpad becomes a center button click. Drags in
//! between follow as center button drags.
//!
//! With "Tap to click" enabled a trackpad tap with the trackpad finger count
//! also produces a center click. A physical click is followed by the same
//! tap report, so the tap right after a rewritten click is skipped.

use super::{GestureRecognizer, MapContext, Transition};
use crate::event::synth;
use crate::event::{Event, EventType, MouseButton};
use crate::sensor::Surface;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Settings of [`MiddleClickMapping`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiddleClickSettings {
    /// Fingers on the Magic Mouse that turn a click into a middle click, 0 disables
    pub on_mousepad: u32,
    /// Fingers on the trackpad that turn a click into a middle click, 0 disables
    pub on_trackpad: u32,
}

impl Default for MiddleClickSettings {
    fn default() -> Self {
        Self {
            on_mousepad: 2,
            on_trackpad: 3,
        }
    }
}

/// Tracks whether the current click is being mapped
#[derive(Debug, Clone, Default)]
pub struct MiddleClickRecognizer {
    settings: MiddleClickSettings,
    mapping: bool,
}

impl MiddleClickRecognizer {
    pub fn new(settings: MiddleClickSettings) -> Self {
        Self {
            settings,
            mapping: false,
        }
    }

    fn fingers_match(&self, ctx: &MapContext<'_>) -> bool {
        let on = |threshold: u32, surface: Surface| {
            threshold > 0 && ctx.sensor.touch_count(surface) == threshold
        };
        on(self.settings.on_mousepad, Surface::Mousepad) || on(self.settings.on_trackpad, Surface::Trackpad)
    }
}

impl GestureRecognizer for MiddleClickRecognizer {
    type State = bool;

    fn state(&self) -> &bool {
        &self.mapping
    }

    fn feed(&mut self, event: &mut Event, ctx: &MapContext<'_>) -> Transition {
        let is_down = matches!(
            event.event_type,
            EventType::LeftMouseDown | EventType::RightMouseDown
        );
        let is_up = matches!(
            event.event_type,
            EventType::LeftMouseUp | EventType::RightMouseUp
        );

        if is_down && self.fingers_match(ctx) {
            let started = !self.mapping;
            self.mapping = true;
            if started {
                return Transition::JustStarted;
            }
        } else if self.mapping && is_up {
            self.mapping = false;
            return Transition::JustFinished;
        }
        Transition::None
    }
}

/// Maps multi-finger clicks and taps to center button clicks
#[derive(Debug, Clone)]
pub struct MiddleClickMapping {
    recognizer: MiddleClickRecognizer,
    skip_next_tap: bool,
}

impl MiddleClickMapping {
    pub fn new(settings: MiddleClickSettings) -> Self {
        Self {
            recognizer: MiddleClickRecognizer::new(settings),
            skip_next_tap: false,
        }
    }

    pub fn settings(&self) -> &MiddleClickSettings {
        &self.recognizer.settings
    }

    pub fn is_mapping(&self) -> bool {
        *self.recognizer.state()
    }

    pub fn map(&mut self, mut event: Event, ctx: &MapContext<'_>) -> Vec<Event> {
        if event.event_type.is_left_or_right_click() {
            let transition = self.recognizer.feed(&mut event, ctx);

            if self.is_mapping() || transition == Transition::JustFinished {
                event.event_type = if event.event_type.is_button_down() {
                    EventType::OtherMouseDown
                } else {
                    EventType::OtherMouseUp
                };
                event.mouse_button = MouseButton::CENTER;
                self.skip_next_tap = true;
                debug!("click mapped to {:?}", event.event_type);
            }
        }

        if self.is_mapping()
            && matches!(
                event.event_type,
                EventType::LeftMouseDragged | EventType::RightMouseDragged
            )
        {
            event.event_type = EventType::OtherMouseDragged;
            event.mouse_button = MouseButton::CENTER;
        }

        vec![event]
    }

    /// Handle a discrete trackpad tap reported by the sensor. Returns the
    /// center click to post, if any.
    pub fn on_trackpad_tap(&mut self, ctx: &MapContext<'_>, location: (f64, f64)) -> Vec<Event> {
        if self.skip_next_tap {
            self.skip_next_tap = false;
            return Vec::new();
        }

        let threshold = self.settings().on_trackpad;
        if threshold == 0
            || ctx.sensor.last_touch_count() != threshold
            || !ctx.sensor.tap_to_click_enabled()
        {
            return Vec::new();
        }

        let click = [EventType::OtherMouseDown, EventType::OtherMouseUp]
            .into_iter()
            .map(|event_type| synth::mouse(event_type, location, MouseButton::CENTER))
            .collect::<Option<Vec<_>>>();
        click.unwrap_or_else(|| {
            warn!("cannot create center click at {:?}", location);
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::StaticSensor;
    use crate::time::timebase::Timestamp;

    fn ctx(sensor: &StaticSensor) -> MapContext<'_> {
        MapContext {
            sensor,
            now: Timestamp::default(),
        }
    }

    fn mouse(event_type: EventType) -> Event {
        let mut event = Event::new(event_type, Timestamp::default());
        event.mouse_button = MouseButton::for_event_type(event_type).unwrap_or_default();
        event
    }

    #[test]
    fn test_two_finger_mousepad_click_becomes_middle_click() {
        let sensor = StaticSensor::new();
        sensor.set_touch_count(Surface::Mousepad, 2);
        let mut mapping = MiddleClickMapping::new(MiddleClickSettings::default());

        let down = mapping.map(mouse(EventType::LeftMouseDown), &ctx(&sensor));
        assert_eq!(down[0].event_type, EventType::OtherMouseDown);
        assert_eq!(down[0].mouse_button, MouseButton::CENTER);

        let drag = mapping.map(mouse(EventType::LeftMouseDragged), &ctx(&sensor));
        assert_eq!(drag[0].event_type, EventType::OtherMouseDragged);
        assert_eq!(drag[0].mouse_button, MouseButton::CENTER);

        // fingers lifted before the button is released
        sensor.set_touch_count(Surface::Mousepad, 0);
        let up = mapping.map(mouse(EventType::LeftMouseUp), &ctx(&sensor));
        assert_eq!(up[0].event_type, EventType::OtherMouseUp);
        assert_eq!(up[0].mouse_button, MouseButton::CENTER);
        assert!(!mapping.is_mapping());

        // next click is untouched
        let plain = mouse(EventType::RightMouseDown);
        assert_eq!(mapping.map(plain.clone(), &ctx(&sensor)), vec![plain]);
    }

    #[test]
    fn test_three_finger_trackpad_click() {
        let sensor = StaticSensor::new();
        sensor.set_touch_count(Surface::Trackpad, 3);
        let mut mapping = MiddleClickMapping::new(MiddleClickSettings::default());

        let down = mapping.map(mouse(EventType::RightMouseDown), &ctx(&sensor));
        assert_eq!(down[0].event_type, EventType::OtherMouseDown);
    }

    #[test]
    fn test_disabled_threshold() {
        let sensor = StaticSensor::new();
        let mut mapping = MiddleClickMapping::new(MiddleClickSettings {
            on_mousepad: 0,
            on_trackpad: 0,
        });

        let down = mouse(EventType::LeftMouseDown);
        assert_eq!(mapping.map(down.clone(), &ctx(&sensor)), vec![down]);
    }

    #[test]
    fn test_tap_after_click_is_skipped() {
        let sensor = StaticSensor::new();
        sensor.set_tap_to_click(true);
        sensor.set_touch_count(Surface::Trackpad, 3);
        let mut mapping = MiddleClickMapping::new(MiddleClickSettings::default());

        mapping.map(mouse(EventType::LeftMouseDown), &ctx(&sensor));
        mapping.map(mouse(EventType::LeftMouseUp), &ctx(&sensor));
        sensor.set_touch_count(Surface::Trackpad, 0);

        assert!(mapping.on_trackpad_tap(&ctx(&sensor), (1.0, 2.0)).is_empty());

        // a later tap clicks
        let click = mapping.on_trackpad_tap(&ctx(&sensor), (1.0, 2.0));
        assert_eq!(click.len(), 2);
        assert_eq!(click[0].event_type, EventType::OtherMouseDown);
        assert_eq!(click[1].event_type, EventType::OtherMouseUp);
        assert_eq!(click[0].location, (1.0, 2.0));
        assert_eq!(click[1].mouse_button, MouseButton::CENTER);
    }

    #[test]
    fn test_tap_requires_tap_to_click_and_count() {
        let sensor = StaticSensor::new();
        sensor.set_last_touch_count(3);
        let mut mapping = MiddleClickMapping::new(MiddleClickSettings::default());
        assert!(mapping.on_trackpad_tap(&ctx(&sensor), (0.0, 0.0)).is_empty());

        sensor.set_tap_to_click(true);
        sensor.set_last_touch_count(2);
        assert!(mapping.on_trackpad_tap(&ctx(&sensor), (0.0, 0.0)).is_empty());

        sensor.set_last_touch_count(3);
        assert_eq!(mapping.on_trackpad_tap(&ctx(&sensor), (0.0, 0.0)).len(), 2);
    }
}
