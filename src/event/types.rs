//! Core event types
//!
//! [`Event`] is the engine's view of a Quartz input event: the event type,
//! gesture subtype, modifier flags, lifecycle phase and the numeric payload
//! fields the mappings read or rewrite. Fields not defined for an event's
//! type are left at their zero value and ignored.

use super::flags::EventFlags;
use crate::time::timebase::Timestamp;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Event types seen by the engine. Discriminants are the `CGEventType` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum EventType {
    /// Placeholder for "no event"
    #[default]
    Null = 0,
    LeftMouseDown = 1,
    LeftMouseUp = 2,
    RightMouseDown = 3,
    RightMouseUp = 4,
    MouseMoved = 5,
    LeftMouseDragged = 6,
    RightMouseDragged = 7,
    KeyDown = 10,
    KeyUp = 11,
    FlagsChanged = 12,
    ScrollWheel = 22,
    OtherMouseDown = 25,
    OtherMouseUp = 26,
    OtherMouseDragged = 27,
    /// Trackpad gesture (magnify, rotate, swipe...); see [`EventSubtype`]
    Gesture = 29,
    /// The tap was disabled because the callback took too long
    TapDisabledByTimeout = 0xFFFF_FFFE,
    /// The tap was disabled by user input
    TapDisabledByUserInput = 0xFFFF_FFFF,
}

impl EventType {
    /// Raw `CGEventType` value
    pub fn as_raw(self) -> u32 {
        self as u32
    }

    /// Left or right button down/up, the range the click recognizers watch
    pub fn is_left_or_right_click(&self) -> bool {
        matches!(
            self,
            EventType::LeftMouseDown
                | EventType::LeftMouseUp
                | EventType::RightMouseDown
                | EventType::RightMouseUp
        )
    }

    /// Any button press
    pub fn is_button_down(&self) -> bool {
        matches!(
            self,
            EventType::LeftMouseDown | EventType::RightMouseDown | EventType::OtherMouseDown
        )
    }

    /// Any button release
    pub fn is_button_up(&self) -> bool {
        matches!(
            self,
            EventType::LeftMouseUp | EventType::RightMouseUp | EventType::OtherMouseUp
        )
    }

    /// Any drag
    pub fn is_drag(&self) -> bool {
        matches!(
            self,
            EventType::LeftMouseDragged | EventType::RightMouseDragged | EventType::OtherMouseDragged
        )
    }

    /// Pointer events that carry a location and a button number
    pub fn is_mouse(&self) -> bool {
        self.is_button_down() || self.is_button_up() || self.is_drag() || *self == EventType::MouseMoved
    }

    /// Tap-disabled notifications; these are not input events
    pub fn is_tap_disabled(&self) -> bool {
        matches!(
            self,
            EventType::TapDisabledByTimeout | EventType::TapDisabledByUserInput
        )
    }
}

impl TryFrom<u32> for EventType {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventType::Null),
            1 => Ok(EventType::LeftMouseDown),
            2 => Ok(EventType::LeftMouseUp),
            3 => Ok(EventType::RightMouseDown),
            4 => Ok(EventType::RightMouseUp),
            5 => Ok(EventType::MouseMoved),
            6 => Ok(EventType::LeftMouseDragged),
            7 => Ok(EventType::RightMouseDragged),
            10 => Ok(EventType::KeyDown),
            11 => Ok(EventType::KeyUp),
            12 => Ok(EventType::FlagsChanged),
            22 => Ok(EventType::ScrollWheel),
            25 => Ok(EventType::OtherMouseDown),
            26 => Ok(EventType::OtherMouseUp),
            27 => Ok(EventType::OtherMouseDragged),
            29 => Ok(EventType::Gesture),
            0xFFFF_FFFE => Ok(EventType::TapDisabledByTimeout),
            0xFFFF_FFFF => Ok(EventType::TapDisabledByUserInput),
            _ => Err(()),
        }
    }
}

/// Gesture subtype of a [`EventType::Gesture`] event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventSubtype {
    /// Any subtype the engine does not rewrite
    #[default]
    Other,
    /// Pinch gesture
    Magnify,
}

impl EventSubtype {
    /// Raw value of the gesture subtype field for magnify gestures
    pub const MAGNIFY_RAW: i64 = 8;

    pub fn from_raw(raw: i64) -> Self {
        if raw == Self::MAGNIFY_RAW {
            EventSubtype::Magnify
        } else {
            EventSubtype::Other
        }
    }
}

/// Lifecycle phase of a scroll or gesture event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No phase: discrete wheel ticks and momentum continuation events
    #[default]
    Other,
    Began,
    Changed,
    Ended,
}

impl Phase {
    /// Decode a scroll or gesture phase field. Cancelled counts as ended so
    /// that every began is eventually closed.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            1 => Phase::Began,
            2 => Phase::Changed,
            4 | 8 => Phase::Ended,
            _ => Phase::Other,
        }
    }

    pub fn as_raw(self) -> i64 {
        match self {
            Phase::Other => 0,
            Phase::Began => 1,
            Phase::Changed => 2,
            Phase::Ended => 4,
        }
    }
}

/// Unit of scroll wheel deltas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScrollUnit {
    /// Continuous (trackpad, Magic Mouse) scrolling in pixels
    Pixel,
    /// Discrete wheel lines
    #[default]
    Line,
}

impl ScrollUnit {
    /// Raw `CGScrollEventUnit` value
    pub fn as_raw(self) -> u32 {
        match self {
            ScrollUnit::Pixel => 0,
            ScrollUnit::Line => 1,
        }
    }
}

/// Mouse button number as used by `CGMouseButton`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MouseButton(pub u32);

impl MouseButton {
    pub const LEFT: MouseButton = MouseButton(0);
    pub const RIGHT: MouseButton = MouseButton(1);
    pub const CENTER: MouseButton = MouseButton(2);
    pub const FOURTH: MouseButton = MouseButton(3);
    pub const FIFTH: MouseButton = MouseButton(4);

    /// Button implied by a left/right event type
    pub fn for_event_type(event_type: EventType) -> Option<MouseButton> {
        match event_type {
            EventType::LeftMouseDown | EventType::LeftMouseUp | EventType::LeftMouseDragged => {
                Some(MouseButton::LEFT)
            }
            EventType::RightMouseDown | EventType::RightMouseUp | EventType::RightMouseDragged => {
                Some(MouseButton::RIGHT)
            }
            _ => None,
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => write!(f, "left"),
            1 => write!(f, "right"),
            2 => write!(f, "center"),
            3 => write!(f, "fourth"),
            4 => write!(f, "fifth"),
            n => write!(f, "button{n}"),
        }
    }
}

impl FromStr for MouseButton {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "left" => Ok(MouseButton::LEFT),
            "right" => Ok(MouseButton::RIGHT),
            "center" | "middle" => Ok(MouseButton::CENTER),
            "fourth" | "back" => Ok(MouseButton::FOURTH),
            "fifth" | "forward" => Ok(MouseButton::FIFTH),
            other => other
                .trim_start_matches("button")
                .parse::<u32>()
                .map(MouseButton)
                .map_err(|_| format!("unknown mouse button: {s}")),
        }
    }
}

impl From<MouseButton> for String {
    fn from(button: MouseButton) -> Self {
        button.to_string()
    }
}

impl TryFrom<String> for MouseButton {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

bitflags! {
    /// Modelled fields in which a mapped event differs from the event it
    /// was derived from. Only these are written back onto the captured
    /// event, so raw values the model cannot represent (e.g. the
    /// `mayBegin` scroll phase) reach the OS untouched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChangedFields: u32 {
        const EVENT_TYPE = 1 << 0;
        const FLAGS = 1 << 1;
        const PHASE = 1 << 2;
        const LOCATION = 1 << 3;
        const SUBTYPE = 1 << 4;
        const MAGNIFICATION = 1 << 5;
        const SCROLL_UNIT = 1 << 6;
        const SCROLL_LINE_DELTA = 1 << 7;
        const SCROLL_POINT_DELTA = 1 << 8;
        const KEY_CODE = 1 << 9;
        const MOUSE_BUTTON = 1 << 10;
        const CLICK_STATE = 1 << 11;
        const MOUSE_DELTA = 1 << 12;
    }
}

/// An input event flowing through the mapping chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Event {
    /// Event type
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Gesture subtype (gesture events only)
    pub subtype: EventSubtype,
    /// Modifier flags
    pub flags: EventFlags,
    /// Scroll or gesture phase
    pub phase: Phase,
    /// Scroll events: OS-generated momentum tail
    pub momentum: bool,
    /// Pointer location in global display coordinates
    pub location: (f64, f64),
    /// Button number (mouse events)
    pub mouse_button: MouseButton,
    /// Click repeat count (mouse button events)
    pub click_state: i64,
    /// Relative pointer movement (mouse move and drag events)
    pub mouse_delta: (i64, i64),
    /// Scroll unit (scroll events)
    pub scroll_unit: ScrollUnit,
    /// Line deltas per wheel axis (scroll events)
    pub scroll_line_delta: [i32; 3],
    /// Pixel deltas per wheel axis (scroll events)
    pub scroll_point_delta: [i32; 3],
    /// Magnification amount (magnify gestures)
    pub magnification: f64,
    /// Virtual key code (key events)
    pub key_code: u16,
    /// Monotonic timestamp
    pub timestamp: Timestamp,
    /// Created by the engine rather than captured from the tap
    pub synthetic: bool,
}

impl Event {
    /// Blank event of the given type at the given time
    pub fn new(event_type: EventType, timestamp: Timestamp) -> Self {
        Self {
            event_type,
            timestamp,
            ..Default::default()
        }
    }

    /// Pinch gesture event
    pub fn is_magnify(&self) -> bool {
        self.event_type == EventType::Gesture && self.subtype == EventSubtype::Magnify
    }

    /// First-axis scroll delta in the event's own unit
    pub fn scroll_units_delta_axis1(&self) -> i32 {
        match self.scroll_unit {
            ScrollUnit::Pixel => self.scroll_point_delta[0],
            ScrollUnit::Line => self.scroll_line_delta[0],
        }
    }

    /// Copy of this event with different flags. The receiver is left untouched
    /// so earlier pipeline stages keep seeing the flags they matched on.
    pub fn with_flags(&self, flags: EventFlags) -> Event {
        Event {
            flags,
            ..self.clone()
        }
    }

    /// Modifier flags with left/right distinctions removed
    pub fn purified_flags(&self) -> EventFlags {
        self.flags.purified()
    }

    /// Fields of `self` that differ from `original`
    pub fn changed_fields(&self, original: &Event) -> ChangedFields {
        let mut changed = ChangedFields::empty();
        changed.set(ChangedFields::EVENT_TYPE, self.event_type != original.event_type);
        changed.set(ChangedFields::FLAGS, self.flags != original.flags);
        changed.set(ChangedFields::PHASE, self.phase != original.phase);
        changed.set(ChangedFields::LOCATION, self.location != original.location);
        changed.set(ChangedFields::SUBTYPE, self.subtype != original.subtype);
        changed.set(
            ChangedFields::MAGNIFICATION,
            self.magnification.to_bits() != original.magnification.to_bits(),
        );
        changed.set(ChangedFields::SCROLL_UNIT, self.scroll_unit != original.scroll_unit);
        changed.set(
            ChangedFields::SCROLL_LINE_DELTA,
            self.scroll_line_delta != original.scroll_line_delta,
        );
        changed.set(
            ChangedFields::SCROLL_POINT_DELTA,
            self.scroll_point_delta != original.scroll_point_delta,
        );
        changed.set(ChangedFields::KEY_CODE, self.key_code != original.key_code);
        changed.set(ChangedFields::MOUSE_BUTTON, self.mouse_button != original.mouse_button);
        changed.set(ChangedFields::CLICK_STATE, self.click_state != original.click_state);
        changed.set(ChangedFields::MOUSE_DELTA, self.mouse_delta != original.mouse_delta);
        changed
    }
}
