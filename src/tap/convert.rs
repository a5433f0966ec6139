//! CGEvent conversion
//!
//! Reads the fields the engine models out of a `CGEventRef` and writes them
//! back. Events derived from a captured event are written onto a copy of it
//! so fields the engine does not model survive; synthetic events start from
//! a fresh `CGEvent` of the right kind.

use crate::event::{ChangedFields, Event, EventFlags, EventSubtype, EventType, MouseButton, Phase, ScrollUnit};
use crate::time::timebase::Timestamp;
use core_foundation::base::CFTypeRef;
use core_graphics::geometry::CGPoint;
use std::ffi::c_void;
use std::ptr;
use tracing::warn;

pub(crate) type CGEventRef = CFTypeRef;
type CGEventSourceRef = *const c_void;

/// `CGEventField` numbers, including the undocumented gesture fields
mod field {
    pub const MOUSE_CLICK_STATE: u32 = 1;
    pub const MOUSE_BUTTON_NUMBER: u32 = 3;
    pub const MOUSE_DELTA_X: u32 = 4;
    pub const MOUSE_DELTA_Y: u32 = 5;
    pub const KEYBOARD_KEYCODE: u32 = 9;
    pub const SCROLL_DELTA_AXIS: [u32; 3] = [11, 12, 13];
    pub const SCROLL_IS_CONTINUOUS: u32 = 88;
    pub const SCROLL_POINT_DELTA_AXIS: [u32; 3] = [96, 97, 98];
    pub const SCROLL_PHASE: u32 = 99;
    pub const GESTURE_SUBTYPE: u32 = 110;
    pub const GESTURE_MAGNIFICATION: u32 = 113;
    pub const SCROLL_MOMENTUM_PHASE: u32 = 123;
    pub const GESTURE_PHASE: u32 = 132;
}

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventCreate(source: CGEventSourceRef) -> CGEventRef;
    fn CGEventCreateCopy(event: CGEventRef) -> CGEventRef;
    fn CGEventCreateScrollWheelEvent2(
        source: CGEventSourceRef,
        units: u32,
        wheel_count: u32,
        wheel1: i32,
        wheel2: i32,
        wheel3: i32,
    ) -> CGEventRef;
    fn CGEventCreateKeyboardEvent(source: CGEventSourceRef, keycode: u16, key_down: bool) -> CGEventRef;
    fn CGEventCreateMouseEvent(
        source: CGEventSourceRef,
        mouse_type: u32,
        location: CGPoint,
        button: u32,
    ) -> CGEventRef;

    fn CGEventSetType(event: CGEventRef, event_type: u32);
    fn CGEventGetFlags(event: CGEventRef) -> u64;
    fn CGEventSetFlags(event: CGEventRef, flags: u64);
    fn CGEventGetLocation(event: CGEventRef) -> CGPoint;
    fn CGEventSetLocation(event: CGEventRef, location: CGPoint);
    fn CGEventGetTimestamp(event: CGEventRef) -> u64;
    fn CGEventGetIntegerValueField(event: CGEventRef, field: u32) -> i64;
    fn CGEventSetIntegerValueField(event: CGEventRef, field: u32, value: i64);
    fn CGEventGetDoubleValueField(event: CGEventRef, field: u32) -> f64;
    fn CGEventSetDoubleValueField(event: CGEventRef, field: u32, value: f64);
}

/// Read a captured event.
///
/// # Safety
/// `cg` must be a valid `CGEventRef` of type `event_type`.
pub(crate) unsafe fn event_from_cg(cg: CGEventRef, event_type: EventType) -> Event {
    let int = |f: u32| CGEventGetIntegerValueField(cg, f);

    let mut event = Event::new(event_type, Timestamp::from_ticks(CGEventGetTimestamp(cg)));
    event.flags = EventFlags::from_bits_retain(CGEventGetFlags(cg));
    let location = CGEventGetLocation(cg);
    event.location = (location.x, location.y);

    match event_type {
        EventType::ScrollWheel => {
            event.scroll_unit = if int(field::SCROLL_IS_CONTINUOUS) != 0 {
                ScrollUnit::Pixel
            } else {
                ScrollUnit::Line
            };
            for axis in 0..3 {
                event.scroll_line_delta[axis] = int(field::SCROLL_DELTA_AXIS[axis]) as i32;
                event.scroll_point_delta[axis] = int(field::SCROLL_POINT_DELTA_AXIS[axis]) as i32;
            }
            event.phase = Phase::from_raw(int(field::SCROLL_PHASE));
            event.momentum = int(field::SCROLL_MOMENTUM_PHASE) != 0;
        }
        EventType::Gesture => {
            event.subtype = EventSubtype::from_raw(int(field::GESTURE_SUBTYPE));
            event.magnification = CGEventGetDoubleValueField(cg, field::GESTURE_MAGNIFICATION);
            event.phase = Phase::from_raw(int(field::GESTURE_PHASE));
        }
        EventType::KeyDown | EventType::KeyUp => {
            event.key_code = int(field::KEYBOARD_KEYCODE) as u16;
        }
        t if t.is_mouse() => {
            event.mouse_button = MouseButton(int(field::MOUSE_BUTTON_NUMBER).max(0) as u32);
            event.click_state = int(field::MOUSE_CLICK_STATE);
            event.mouse_delta = (int(field::MOUSE_DELTA_X), int(field::MOUSE_DELTA_Y));
        }
        _ => {}
    }
    event
}

/// Write the `changed` fields of `event` onto `cg`. Everything else on `cg`
/// is left as it is.
///
/// # Safety
/// `cg` must be a valid, mutable `CGEventRef`.
pub(crate) unsafe fn write_to_cg(event: &Event, cg: CGEventRef, changed: ChangedFields) {
    let set = |f: u32, value: i64| CGEventSetIntegerValueField(cg, f, value);

    if changed.contains(ChangedFields::EVENT_TYPE) {
        CGEventSetType(cg, event.event_type.as_raw());
    }
    if changed.contains(ChangedFields::FLAGS) {
        CGEventSetFlags(cg, event.flags.bits());
    }
    if changed.contains(ChangedFields::LOCATION) {
        CGEventSetLocation(cg, CGPoint::new(event.location.0, event.location.1));
    }

    match event.event_type {
        EventType::ScrollWheel => {
            if changed.contains(ChangedFields::SCROLL_UNIT) {
                set(
                    field::SCROLL_IS_CONTINUOUS,
                    i64::from(event.scroll_unit == ScrollUnit::Pixel),
                );
            }
            for axis in 0..3 {
                if changed.contains(ChangedFields::SCROLL_LINE_DELTA) {
                    set(field::SCROLL_DELTA_AXIS[axis], i64::from(event.scroll_line_delta[axis]));
                }
                if changed.contains(ChangedFields::SCROLL_POINT_DELTA) {
                    set(field::SCROLL_POINT_DELTA_AXIS[axis], i64::from(event.scroll_point_delta[axis]));
                }
            }
            if changed.contains(ChangedFields::PHASE) {
                set(field::SCROLL_PHASE, event.phase.as_raw());
            }
        }
        EventType::Gesture => {
            if changed.contains(ChangedFields::SUBTYPE) && event.subtype == EventSubtype::Magnify {
                set(field::GESTURE_SUBTYPE, EventSubtype::MAGNIFY_RAW);
            }
            if changed.contains(ChangedFields::MAGNIFICATION) {
                CGEventSetDoubleValueField(cg, field::GESTURE_MAGNIFICATION, event.magnification);
            }
            if changed.contains(ChangedFields::PHASE) {
                set(field::GESTURE_PHASE, event.phase.as_raw());
            }
        }
        EventType::KeyDown | EventType::KeyUp => {
            if changed.contains(ChangedFields::KEY_CODE) {
                set(field::KEYBOARD_KEYCODE, i64::from(event.key_code));
            }
        }
        t if t.is_mouse() => {
            if changed.contains(ChangedFields::MOUSE_BUTTON) {
                set(field::MOUSE_BUTTON_NUMBER, i64::from(event.mouse_button.0));
            }
            if changed.contains(ChangedFields::CLICK_STATE) {
                set(field::MOUSE_CLICK_STATE, event.click_state);
            }
            if changed.contains(ChangedFields::MOUSE_DELTA) {
                set(field::MOUSE_DELTA_X, event.mouse_delta.0);
                set(field::MOUSE_DELTA_Y, event.mouse_delta.1);
            }
        }
        _ => {}
    }
}

/// Build a new retained `CGEventRef` for `event`.
///
/// A non-synthetic event derived from a captured one is written onto a copy
/// of it, given as the captured `CGEventRef` and its decoded [`Event`]; only
/// the fields that differ from the decoded event are written. Synthetic
/// events start from a blank event with every field written.
///
/// Returns `None` if Core Graphics could not create the event.
///
/// # Safety
/// `original`, if given, must hold a valid `CGEventRef`.
pub(crate) unsafe fn event_to_cg(event: &Event, original: Option<(CGEventRef, &Event)>) -> Option<CGEventRef> {
    let (cg, changed) = match original {
        Some((cg, input)) if !event.synthetic && !cg.is_null() => {
            (CGEventCreateCopy(cg), event.changed_fields(input))
        }
        _ => (create_blank(event), ChangedFields::all()),
    };
    if cg.is_null() {
        warn!("Cannot create CGEvent for {:?}", event.event_type);
        return None;
    }
    write_to_cg(event, cg, changed);
    Some(cg)
}

unsafe fn create_blank(event: &Event) -> CGEventRef {
    let source: CGEventSourceRef = ptr::null();
    match event.event_type {
        EventType::ScrollWheel => {
            let deltas = match event.scroll_unit {
                ScrollUnit::Pixel => event.scroll_point_delta,
                ScrollUnit::Line => event.scroll_line_delta,
            };
            let wheel_count = deltas.iter().rposition(|d| *d != 0).map_or(1, |i| i + 1) as u32;
            CGEventCreateScrollWheelEvent2(
                source,
                event.scroll_unit.as_raw(),
                wheel_count,
                deltas[0],
                deltas[1],
                deltas[2],
            )
        }
        EventType::KeyDown | EventType::KeyUp => {
            CGEventCreateKeyboardEvent(source, event.key_code, event.event_type == EventType::KeyDown)
        }
        t if t.is_mouse() => CGEventCreateMouseEvent(
            source,
            t.as_raw(),
            CGPoint::new(event.location.0, event.location.1),
            event.mouse_button.0,
        ),
        _ => CGEventCreate(source),
    }
}

/// Current pointer location in global display coordinates
pub fn pointer_location() -> (f64, f64) {
    unsafe {
        let current = CGEventCreate(ptr::null());
        if current.is_null() {
            return (0.0, 0.0);
        }
        let location = CGEventGetLocation(current);
        core_foundation::base::CFRelease(current);
        (location.x, location.y)
    }
}
