//! Event mappings
//!
//! A mapping turns one input event into zero or more output events. Each
//! mapping family owns its own gesture state; nothing is shared between
//! mapping instances. Mappings never fail: events outside a mapping's
//! interest come back unchanged.
//!
//! [`MappingSettings`] is the configuration side (serde, one variant per
//! family) and [`Mapping`] the runtime side built from it.

pub mod middle_click;
pub mod multi_click;
pub mod multi_tap;
pub mod other_mouse_scroll;
pub mod other_mouse_zoom;
pub mod pinch;
pub mod scroll_to_pinch;

pub use middle_click::{MiddleClickMapping, MiddleClickSettings};
pub use multi_click::{MultiClickMapping, MultiClickSettings};
pub use multi_tap::{MultiTapMapping, MultiTapSettings};
pub use other_mouse_scroll::{OtherMouseScrollMapping, OtherMouseScrollSettings};
pub use other_mouse_zoom::{OtherMouseZoomMapping, OtherMouseZoomSettings, ZoomTrigger};
pub use pinch::{PinchMapping, PinchSettings, Replacement};
pub use scroll_to_pinch::{MagicMouseZoomMapping, MagicMouseZoomSettings, ScrollToPinchState};

use crate::event::Event;
use crate::preset::PresetMapping;
use crate::sensor::TouchSensor;
use crate::time::timebase::Timestamp;
use serde::{Deserialize, Serialize};

/// What a recognizer reports for one fed event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transition {
    #[default]
    None,
    JustStarted,
    JustFinished,
    /// A dropped gesture ended; nothing is to be emitted for it
    JustFinishedDropping,
}

/// A gesture state machine fed one event at a time
pub trait GestureRecognizer {
    type State;

    /// Current state
    fn state(&self) -> &Self::State;

    /// Advance with `event`. Recognizers may adjust the event's phase when a
    /// state change requires it.
    fn feed(&mut self, event: &mut Event, ctx: &MapContext<'_>) -> Transition;
}

/// Per-event inputs besides the event itself
#[derive(Clone, Copy)]
pub struct MapContext<'a> {
    pub sensor: &'a dyn TouchSensor,
    /// Time used for timing windows, chosen once per incoming event
    pub now: Timestamp,
}

/// Configuration of one mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingSettings {
    MagicMouseZoom(MagicMouseZoomSettings),
    MiddleClick(MiddleClickSettings),
    MultiClick(MultiClickSettings),
    MultiTap(MultiTapSettings),
    OtherMouseScroll(OtherMouseScrollSettings),
    OtherMouseZoom(OtherMouseZoomSettings),
    Pinch(PinchSettings),
}

impl MappingSettings {
    pub fn magic_mouse_zoom() -> Self {
        MappingSettings::MagicMouseZoom(MagicMouseZoomSettings::default())
    }

    pub fn middle_click() -> Self {
        MappingSettings::MiddleClick(MiddleClickSettings::default())
    }

    pub fn multi_click() -> Self {
        MappingSettings::MultiClick(MultiClickSettings::default())
    }

    pub fn multi_tap() -> Self {
        MappingSettings::MultiTap(MultiTapSettings::default())
    }

    pub fn other_mouse_scroll() -> Self {
        MappingSettings::OtherMouseScroll(OtherMouseScrollSettings::default())
    }

    pub fn other_mouse_zoom() -> Self {
        MappingSettings::OtherMouseZoom(OtherMouseZoomSettings::default())
    }

    /// Configuration key of the variant
    pub fn name(&self) -> &'static str {
        match self {
            MappingSettings::MagicMouseZoom(_) => "magic_mouse_zoom",
            MappingSettings::MiddleClick(_) => "middle_click",
            MappingSettings::MultiClick(_) => "multi_click",
            MappingSettings::MultiTap(_) => "multi_tap",
            MappingSettings::OtherMouseScroll(_) => "other_mouse_scroll",
            MappingSettings::OtherMouseZoom(_) => "other_mouse_zoom",
            MappingSettings::Pinch(_) => "pinch",
        }
    }

    /// Check numeric settings. Returns a description of the first problem.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let sensitivity = match self {
            MappingSettings::MagicMouseZoom(s) => {
                if s.grace_window_ms == 0 {
                    return Err(format!("{}: grace_window_ms must be positive", self.name()));
                }
                Some(s.sensitivity)
            }
            MappingSettings::OtherMouseZoom(s) => {
                if !s.min_drag_distance.is_finite() || s.min_drag_distance < 0.0 {
                    return Err(format!("{}: min_drag_distance must be >= 0", self.name()));
                }
                Some(s.sensitivity)
            }
            MappingSettings::Pinch(s) => return validate_pinch(s).map_err(|e| format!("{}: {}", self.name(), e)),
            MappingSettings::MiddleClick(s) => {
                if s.on_mousepad > 10 || s.on_trackpad > 10 {
                    return Err(format!("{}: finger counts must be at most 10", self.name()));
                }
                None
            }
            MappingSettings::MultiClick(_) | MappingSettings::MultiTap(_) | MappingSettings::OtherMouseScroll(_) => None,
        };

        match sensitivity {
            Some(value) if !value.is_finite() || value == 0.0 => {
                Err(format!("{}: sensitivity must be finite and non-zero", self.name()))
            }
            _ => Ok(()),
        }
    }

    /// Build a fresh mapping with empty gesture state.
    pub fn build(&self) -> Mapping {
        match self {
            MappingSettings::MagicMouseZoom(s) => Mapping::MagicMouseZoom(MagicMouseZoomMapping::new(s.clone())),
            MappingSettings::MiddleClick(s) => Mapping::MiddleClick(MiddleClickMapping::new(s.clone())),
            MappingSettings::MultiClick(s) => Mapping::MultiClick(MultiClickMapping::new(s.clone())),
            MappingSettings::MultiTap(s) => Mapping::MultiTap(MultiTapMapping::new(s.clone())),
            MappingSettings::OtherMouseScroll(s) => Mapping::OtherMouseScroll(OtherMouseScrollMapping::new(s.clone())),
            MappingSettings::OtherMouseZoom(s) => Mapping::OtherMouseZoom(OtherMouseZoomMapping::new(s.clone())),
            MappingSettings::Pinch(s) => Mapping::Pinch(PinchMapping::new(s.clone())),
        }
    }
}

/// Check pinch settings
pub fn validate_pinch(settings: &PinchSettings) -> std::result::Result<(), String> {
    if !settings.sensitivity.is_finite() || settings.sensitivity == 0.0 {
        return Err("sensitivity must be finite and non-zero".into());
    }
    if let Some(Replacement::Keys { code_a, code_b }) = settings.replace_with {
        if code_a > 0x7F || code_b > 0x7F {
            return Err(format!("key codes {code_a}/{code_b} out of range"));
        }
    }
    Ok(())
}

/// A stateful event transformer
#[derive(Debug, Clone)]
pub enum Mapping {
    MagicMouseZoom(MagicMouseZoomMapping),
    MiddleClick(MiddleClickMapping),
    MultiClick(MultiClickMapping),
    MultiTap(MultiTapMapping),
    OtherMouseScroll(OtherMouseScrollMapping),
    OtherMouseZoom(OtherMouseZoomMapping),
    Pinch(PinchMapping),
    /// Per-application stage: pinch settings selected by modifier flags
    Preset(PresetMapping),
}

impl Mapping {
    pub fn name(&self) -> &str {
        match self {
            Mapping::MagicMouseZoom(_) => "magic_mouse_zoom",
            Mapping::MiddleClick(_) => "middle_click",
            Mapping::MultiClick(_) => "multi_click",
            Mapping::MultiTap(_) => "multi_tap",
            Mapping::OtherMouseScroll(_) => "other_mouse_scroll",
            Mapping::OtherMouseZoom(_) => "other_mouse_zoom",
            Mapping::Pinch(_) => "pinch",
            Mapping::Preset(preset) => preset.name(),
        }
    }

    /// Map one event to its replacement events, in order.
    pub fn map(&mut self, event: Event, ctx: &MapContext<'_>) -> Vec<Event> {
        match self {
            Mapping::MagicMouseZoom(m) => m.map(event, ctx),
            Mapping::MiddleClick(m) => m.map(event, ctx),
            Mapping::MultiClick(m) => m.map(event, ctx),
            Mapping::MultiTap(m) => m.map(event, ctx),
            Mapping::OtherMouseScroll(m) => m.map(event, ctx),
            Mapping::OtherMouseZoom(m) => m.map(event, ctx),
            Mapping::Pinch(m) => m.map(event, ctx),
            Mapping::Preset(m) => m.map(event, ctx),
        }
    }

    /// Discrete trackpad tap. Only the middle click mapping reacts.
    pub fn on_trackpad_tap(&mut self, ctx: &MapContext<'_>, location: (f64, f64)) -> Vec<Event> {
        match self {
            Mapping::MiddleClick(m) => m.on_trackpad_tap(ctx, location),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventFlags, EventType, MouseButton};
    use crate::sensor::StaticSensor;

    #[test]
    fn test_settings_toml_round_trip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Wrapper {
            mappings: Vec<MappingSettings>,
        }

        let wrapper = Wrapper {
            mappings: vec![
                MappingSettings::middle_click(),
                MappingSettings::magic_mouse_zoom(),
                MappingSettings::multi_tap(),
                MappingSettings::other_mouse_zoom(),
            ],
        };
        let text = toml::to_string(&wrapper).unwrap();
        assert!(text.contains("middle_click"));
        let back: Wrapper = toml::from_str(&text).unwrap();
        assert_eq!(back, wrapper);
    }

    #[test]
    fn test_settings_partial_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            mapping: MappingSettings,
        }

        let wrapper: Wrapper = toml::from_str("[mapping.multi_click]\nbutton = \"fifth\"\n").unwrap();
        match wrapper.mapping {
            MappingSettings::MultiClick(s) => {
                assert_eq!(s.button, MouseButton::FIFTH);
                assert_eq!(s.double_click_flags, EventFlags::COMMAND);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_validate() {
        assert!(MappingSettings::magic_mouse_zoom().validate().is_ok());
        assert!(MappingSettings::MagicMouseZoom(MagicMouseZoomSettings {
            sensitivity: f64::NAN,
            ..Default::default()
        })
        .validate()
        .is_err());
        assert!(MappingSettings::Pinch(PinchSettings::pinch_to_wheel(EventFlags::empty(), 0.0))
            .validate()
            .is_err());
        assert!(MappingSettings::Pinch(PinchSettings::pinch_to_keys(200, 1, EventFlags::empty(), 1.0))
            .validate()
            .is_err());
        assert!(MappingSettings::MiddleClick(MiddleClickSettings {
            on_mousepad: 11,
            on_trackpad: 0
        })
        .validate()
        .is_err());
    }

    #[test]
    fn test_build_names_match() {
        for settings in [
            MappingSettings::magic_mouse_zoom(),
            MappingSettings::middle_click(),
            MappingSettings::multi_click(),
            MappingSettings::multi_tap(),
            MappingSettings::other_mouse_scroll(),
            MappingSettings::other_mouse_zoom(),
            MappingSettings::Pinch(PinchSettings::default()),
        ] {
            assert_eq!(settings.build().name(), settings.name());
        }
    }

    #[test]
    fn test_uninterested_events_pass_through() {
        let sensor = StaticSensor::new();
        let ctx = MapContext {
            sensor: &sensor,
            now: Timestamp::default(),
        };
        let event = Event::new(EventType::KeyDown, Timestamp::from_millis(3));

        for settings in [
            MappingSettings::magic_mouse_zoom(),
            MappingSettings::middle_click(),
            MappingSettings::multi_click(),
            MappingSettings::multi_tap(),
            MappingSettings::other_mouse_scroll(),
            MappingSettings::other_mouse_zoom(),
            MappingSettings::Pinch(PinchSettings::default_wheel()),
        ] {
            let mut mapping = settings.build();
            assert_eq!(mapping.map(event.clone(), &ctx), vec![event.clone()], "{}", mapping.name());
            assert!(mapping.on_trackpad_tap(&ctx, (0.0, 0.0)).is_empty());
        }
    }
}
