//! Synthetic event construction
//!
//! Every constructor stamps the current monotonic time and marks the event
//! as synthetic. Constructors whose arguments cannot describe a valid event
//! return `None`; callers log and carry on without it.

use super::flags::EventFlags;
use super::types::{Event, EventSubtype, EventType, MouseButton, Phase, ScrollUnit};
use crate::time::timebase::Timestamp;

/// Pixels per line used when a line-based wheel event also needs pixel deltas
const PIXELS_PER_LINE: i32 = 10;

fn synthetic(event_type: EventType) -> Event {
    Event {
        synthetic: true,
        ..Event::new(event_type, Timestamp::now())
    }
}

/// Scroll wheel event with one to three wheel deltas.
pub fn scroll_wheel(unit: ScrollUnit, wheels: &[i32]) -> Option<Event> {
    if wheels.is_empty() || wheels.len() > 3 {
        return None;
    }

    let mut event = synthetic(EventType::ScrollWheel);
    event.scroll_unit = unit;
    for (axis, &delta) in wheels.iter().enumerate() {
        match unit {
            ScrollUnit::Pixel => {
                event.scroll_point_delta[axis] = delta;
                event.scroll_line_delta[axis] = delta.signum();
            }
            ScrollUnit::Line => {
                event.scroll_line_delta[axis] = delta;
                event.scroll_point_delta[axis] = delta.saturating_mul(PIXELS_PER_LINE);
            }
        }
    }
    Some(event)
}

/// Magnify gesture event
pub fn magnify(magnification: f64, phase: Phase) -> Event {
    let mut event = synthetic(EventType::Gesture);
    event.subtype = EventSubtype::Magnify;
    event.magnification = magnification;
    event.phase = phase;
    event
}

/// Flags-changed event announcing `flags` as the current modifier state
pub fn flags_changed(flags: EventFlags) -> Event {
    let mut event = synthetic(EventType::FlagsChanged);
    event.flags = flags;
    event
}

/// Key down or key up event
pub fn keyboard(key_code: u16, key_down: bool) -> Event {
    let mut event = synthetic(if key_down { EventType::KeyDown } else { EventType::KeyUp });
    event.key_code = key_code;
    event
}

/// Mouse event at a location. Only pointer event types are accepted.
pub fn mouse(event_type: EventType, location: (f64, f64), button: MouseButton) -> Option<Event> {
    if !event_type.is_mouse() {
        return None;
    }

    let mut event = synthetic(event_type);
    event.location = location;
    event.mouse_button = button;
    if event_type.is_button_down() || event_type.is_button_up() {
        event.click_state = 1;
    }
    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_wheel_rejects_bad_wheel_counts() {
        assert!(scroll_wheel(ScrollUnit::Pixel, &[]).is_none());
        assert!(scroll_wheel(ScrollUnit::Pixel, &[1, 2, 3, 4]).is_none());
        assert!(scroll_wheel(ScrollUnit::Line, &[1, 2, 3]).is_some());
    }

    #[test]
    fn test_scroll_wheel_pixel() {
        let event = scroll_wheel(ScrollUnit::Pixel, &[-7]).unwrap();
        assert_eq!(event.event_type, EventType::ScrollWheel);
        assert_eq!(event.scroll_unit, ScrollUnit::Pixel);
        assert_eq!(event.scroll_point_delta, [-7, 0, 0]);
        assert_eq!(event.scroll_line_delta, [-1, 0, 0]);
        assert!(event.synthetic);
    }

    #[test]
    fn test_scroll_wheel_line_second_axis() {
        let event = scroll_wheel(ScrollUnit::Line, &[0, 3]).unwrap();
        assert_eq!(event.scroll_line_delta, [0, 3, 0]);
        assert_eq!(event.scroll_point_delta, [0, 30, 0]);
    }

    #[test]
    fn test_magnify() {
        let event = magnify(0.5, Phase::Began);
        assert!(event.is_magnify());
        assert_eq!(event.magnification, 0.5);
        assert_eq!(event.phase, Phase::Began);
        assert_eq!(event.flags, EventFlags::empty());
    }

    #[test]
    fn test_flags_changed_and_keyboard() {
        let event = flags_changed(EventFlags::COMMAND);
        assert_eq!(event.event_type, EventType::FlagsChanged);
        assert_eq!(event.flags, EventFlags::COMMAND);

        let down = keyboard(44, true);
        let up = keyboard(44, false);
        assert_eq!(down.event_type, EventType::KeyDown);
        assert_eq!(up.event_type, EventType::KeyUp);
        assert_eq!(up.key_code, 44);
    }

    #[test]
    fn test_mouse() {
        let event = mouse(EventType::OtherMouseDown, (10.0, 20.0), MouseButton::CENTER).unwrap();
        assert_eq!(event.location, (10.0, 20.0));
        assert_eq!(event.mouse_button, MouseButton::CENTER);
        assert_eq!(event.click_state, 1);

        assert!(mouse(EventType::KeyDown, (0.0, 0.0), MouseButton::LEFT).is_none());
    }

    #[test]
    fn test_timestamps_are_stamped() {
        let before = Timestamp::now();
        let event = magnify(0.0, Phase::Ended);
        assert!(event.timestamp >= before);
    }
}
