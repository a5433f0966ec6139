//! Extra button held: vertical scroll becomes horizontal scroll

use super::MapContext;
use crate::event::synth;
use crate::event::{Event, EventType, MouseButton};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Settings of [`OtherMouseScrollMapping`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtherMouseScrollSettings {
    pub button: MouseButton,
    /// Swallow the button's own clicks and drags
    pub no_clicks: bool,
}

impl Default for OtherMouseScrollSettings {
    fn default() -> Self {
        Self {
            button: MouseButton::FOURTH,
            no_clicks: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OtherMouseScrollMapping {
    settings: OtherMouseScrollSettings,
    button_down: bool,
}

impl OtherMouseScrollMapping {
    pub fn new(settings: OtherMouseScrollSettings) -> Self {
        Self {
            settings,
            button_down: false,
        }
    }

    pub fn settings(&self) -> &OtherMouseScrollSettings {
        &self.settings
    }

    pub fn map(&mut self, event: Event, _ctx: &MapContext<'_>) -> Vec<Event> {
        let own_button = event.mouse_button == self.settings.button;
        match event.event_type {
            EventType::OtherMouseDown | EventType::OtherMouseUp if own_button => {
                self.button_down = event.event_type == EventType::OtherMouseDown;
                if self.settings.no_clicks {
                    return Vec::new();
                }
            }
            EventType::ScrollWheel if self.button_down => {
                let delta = event.scroll_units_delta_axis1();
                return match synth::scroll_wheel(event.scroll_unit, &[0, delta]) {
                    Some(mut horizontal) => {
                        horizontal.flags = event.flags;
                        horizontal.location = event.location;
                        vec![horizontal]
                    }
                    None => {
                        warn!("cannot create horizontal scroll event");
                        vec![event]
                    }
                };
            }
            EventType::OtherMouseDragged if self.button_down && own_button && self.settings.no_clicks => {
                return Vec::new();
            }
            _ => {}
        }
        vec![event]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ScrollUnit;
    use crate::sensor::StaticSensor;
    use crate::time::timebase::Timestamp;

    fn button(event_type: EventType) -> Event {
        let mut event = Event::new(event_type, Timestamp::default());
        event.mouse_button = MouseButton::FOURTH;
        event
    }

    fn line_scroll(lines: i32) -> Event {
        let mut event = Event::new(EventType::ScrollWheel, Timestamp::default());
        event.scroll_unit = ScrollUnit::Line;
        event.scroll_line_delta = [lines, 0, 0];
        event
    }

    #[test]
    fn test_scroll_turns_horizontal_while_held() {
        let sensor = StaticSensor::new();
        let ctx = MapContext {
            sensor: &sensor,
            now: Timestamp::default(),
        };
        let mut mapping = OtherMouseScrollMapping::new(OtherMouseScrollSettings::default());

        assert!(mapping.map(button(EventType::OtherMouseDown), &ctx).is_empty());
        assert!(mapping.map(button(EventType::OtherMouseDragged), &ctx).is_empty());

        let out = mapping.map(line_scroll(-2), &ctx);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].scroll_unit, ScrollUnit::Line);
        assert_eq!(out[0].scroll_line_delta, [0, -2, 0]);

        assert!(mapping.map(button(EventType::OtherMouseUp), &ctx).is_empty());
        let scroll = line_scroll(1);
        assert_eq!(mapping.map(scroll.clone(), &ctx), vec![scroll]);
    }

    #[test]
    fn test_clicks_pass_without_no_clicks() {
        let sensor = StaticSensor::new();
        let ctx = MapContext {
            sensor: &sensor,
            now: Timestamp::default(),
        };
        let mut mapping = OtherMouseScrollMapping::new(OtherMouseScrollSettings {
            button: MouseButton::FOURTH,
            no_clicks: false,
        });

        let down = button(EventType::OtherMouseDown);
        assert_eq!(mapping.map(down.clone(), &ctx), vec![down]);
        let drag = button(EventType::OtherMouseDragged);
        assert_eq!(mapping.map(drag.clone(), &ctx), vec![drag]);
    }
}
