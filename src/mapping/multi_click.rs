//! Double and triple click modifiers
//!
//! Holding an extra mouse button after a double or triple click turns
//! scrolling into modified scrolling, e.g. command-scroll to zoom.

use super::MapContext;
use crate::event::{Event, EventFlags, EventType, MouseButton};
use serde::{Deserialize, Serialize};

/// Settings of [`MultiClickMapping`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiClickSettings {
    pub button: MouseButton,
    pub double_click_flags: EventFlags,
    pub triple_click_flags: EventFlags,
}

impl Default for MultiClickSettings {
    fn default() -> Self {
        Self {
            button: MouseButton::CENTER,
            double_click_flags: EventFlags::COMMAND,
            triple_click_flags: EventFlags::ALTERNATE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MultiClickMapping {
    settings: MultiClickSettings,
    flags: Option<EventFlags>,
}

impl MultiClickMapping {
    pub fn new(settings: MultiClickSettings) -> Self {
        Self { settings, flags: None }
    }

    pub fn settings(&self) -> &MultiClickSettings {
        &self.settings
    }

    pub fn map(&mut self, mut event: Event, _ctx: &MapContext<'_>) -> Vec<Event> {
        let own_button = event.mouse_button == self.settings.button;
        match event.event_type {
            EventType::OtherMouseDown if own_button => {
                self.flags = match event.click_state {
                    2 => Some(self.settings.double_click_flags),
                    3 => Some(self.settings.triple_click_flags),
                    _ => None,
                };
            }
            EventType::OtherMouseUp if own_button => self.flags = None,
            EventType::ScrollWheel => {
                if let Some(flags) = self.flags {
                    event.flags = flags;
                }
            }
            _ => {}
        }
        vec![event]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::StaticSensor;
    use crate::time::timebase::Timestamp;

    fn button(event_type: EventType, button: MouseButton, clicks: i64) -> Event {
        let mut event = Event::new(event_type, Timestamp::default());
        event.mouse_button = button;
        event.click_state = clicks;
        event
    }

    #[test]
    fn test_double_and_triple_click_flags() {
        let sensor = StaticSensor::new();
        let ctx = MapContext {
            sensor: &sensor,
            now: Timestamp::default(),
        };
        let mut mapping = MultiClickMapping::new(MultiClickSettings::default());
        let scroll = Event::new(EventType::ScrollWheel, Timestamp::default());

        mapping.map(button(EventType::OtherMouseDown, MouseButton::CENTER, 2), &ctx);
        assert_eq!(mapping.map(scroll.clone(), &ctx)[0].flags, EventFlags::COMMAND);

        mapping.map(button(EventType::OtherMouseUp, MouseButton::CENTER, 2), &ctx);
        assert_eq!(mapping.map(scroll.clone(), &ctx)[0].flags, EventFlags::empty());

        mapping.map(button(EventType::OtherMouseDown, MouseButton::CENTER, 3), &ctx);
        assert_eq!(mapping.map(scroll.clone(), &ctx)[0].flags, EventFlags::ALTERNATE);
    }

    #[test]
    fn test_single_click_and_other_buttons_ignored() {
        let sensor = StaticSensor::new();
        let ctx = MapContext {
            sensor: &sensor,
            now: Timestamp::default(),
        };
        let mut mapping = MultiClickMapping::new(MultiClickSettings::default());
        let scroll = Event::new(EventType::ScrollWheel, Timestamp::default());

        mapping.map(button(EventType::OtherMouseDown, MouseButton::CENTER, 1), &ctx);
        assert_eq!(mapping.map(scroll.clone(), &ctx), vec![scroll.clone()]);

        mapping.map(button(EventType::OtherMouseDown, MouseButton::FOURTH, 2), &ctx);
        assert_eq!(mapping.map(scroll.clone(), &ctx), vec![scroll]);
    }
}
