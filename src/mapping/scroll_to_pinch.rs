//! Two-finger scroll to pinch
//!
//! On a Magic Mouse a two-finger swipe arrives as an ordinary phased scroll
//! gesture. [`ScrollToPinchRecognizer`] claims scroll gestures that begin with
//! exactly two fingers on the configured surface, and
//! [`MagicMouseZoomMapping`] re-emits them as magnify gestures.
//!
//! After such a gesture ends the OS keeps sending momentum scroll events, and
//! a quick second swipe may start while they are still arriving. Both are
//! dropped until the grace window has passed and the fingers have lifted, so
//! a zoom never turns into a scroll of the page underneath.

use super::{GestureRecognizer, MapContext, Transition};
use crate::event::synth;
use crate::event::{Event, EventType, Phase};
use crate::sensor::Surface;
use crate::time::timebase::{Duration, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Fingers that turn a scroll into a pinch
const PINCH_FINGERS: u32 = 2;

/// Recognizer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollToPinchState {
    #[default]
    Inactive,
    /// Scroll events are reinterpreted as magnify deltas
    Mapping,
    /// Momentum after a mapped gesture is dropped
    DropMomentum { since: Timestamp },
    /// A scroll gesture started during the grace window is dropped
    DropScroll { since: Timestamp },
}

impl ScrollToPinchState {
    pub fn is_dropping(&self) -> bool {
        matches!(
            self,
            ScrollToPinchState::DropMomentum { .. } | ScrollToPinchState::DropScroll { .. }
        )
    }
}

/// Scroll-to-pinch state machine
#[derive(Debug, Clone)]
pub struct ScrollToPinchRecognizer {
    state: ScrollToPinchState,
    surface: Surface,
    grace_window: Duration,
}

impl ScrollToPinchRecognizer {
    pub fn new(surface: Surface, grace_window: Duration) -> Self {
        Self {
            state: ScrollToPinchState::Inactive,
            surface,
            grace_window,
        }
    }
}

impl GestureRecognizer for ScrollToPinchRecognizer {
    type State = ScrollToPinchState;

    fn state(&self) -> &ScrollToPinchState {
        &self.state
    }

    /// Feed a scroll event. A drop-scroll that outlives the grace window
    /// rewrites the event's phase to `began` so the pass-through scroll is
    /// well formed.
    fn feed(&mut self, event: &mut Event, ctx: &MapContext<'_>) -> Transition {
        let (grace_window, surface) = (self.grace_window, self.surface);
        let within_grace = |since: Timestamp| ctx.now.duration_since(since) < grace_window;
        let fingers = || ctx.sensor.touch_count(surface);

        match self.state {
            ScrollToPinchState::Mapping if event.phase == Phase::Ended => {
                self.state = ScrollToPinchState::DropMomentum { since: ctx.now };
                return Transition::JustFinished;
            }
            ScrollToPinchState::DropMomentum { since }
                if event.phase == Phase::Began && within_grace(since) =>
            {
                self.state = ScrollToPinchState::DropScroll { since };
            }
            ScrollToPinchState::DropMomentum { since }
                if !event.momentum && !within_grace(since) && fingers() != PINCH_FINGERS =>
            {
                self.state = ScrollToPinchState::Inactive;
            }
            ScrollToPinchState::DropScroll { since } if event.phase == Phase::Ended => {
                self.state = ScrollToPinchState::DropMomentum { since };
                return Transition::JustFinishedDropping;
            }
            ScrollToPinchState::DropScroll { since }
                if event.phase == Phase::Changed && !within_grace(since) =>
            {
                self.state = ScrollToPinchState::Inactive;
                event.phase = Phase::Began;
            }
            _ => {
                if event.phase == Phase::Began && fingers() == PINCH_FINGERS {
                    self.state = ScrollToPinchState::Mapping;
                    return Transition::JustStarted;
                }
            }
        }

        Transition::None
    }
}

/// Settings of [`MagicMouseZoomMapping`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagicMouseZoomSettings {
    /// Magnification per scrolled pixel
    pub sensitivity: f64,
    /// Surface whose finger count starts a pinch
    pub surface: Surface,
    /// Grace window after a pinch in which scrolling stays suppressed
    pub grace_window_ms: u64,
}

impl Default for MagicMouseZoomSettings {
    fn default() -> Self {
        Self {
            sensitivity: 0.005,
            surface: Surface::Mousepad,
            grace_window_ms: 100,
        }
    }
}

/// Maps two-finger scroll gestures to magnify gestures
#[derive(Debug, Clone)]
pub struct MagicMouseZoomMapping {
    settings: MagicMouseZoomSettings,
    recognizer: ScrollToPinchRecognizer,
}

impl MagicMouseZoomMapping {
    pub fn new(settings: MagicMouseZoomSettings) -> Self {
        let recognizer = ScrollToPinchRecognizer::new(
            settings.surface,
            Duration::from_millis(settings.grace_window_ms),
        );
        Self { settings, recognizer }
    }

    pub fn settings(&self) -> &MagicMouseZoomSettings {
        &self.settings
    }

    pub fn state(&self) -> ScrollToPinchState {
        *self.recognizer.state()
    }

    pub fn map(&mut self, mut event: Event, ctx: &MapContext<'_>) -> Vec<Event> {
        if event.event_type != EventType::ScrollWheel {
            return vec![event];
        }

        let transition = self.recognizer.feed(&mut event, ctx);
        if transition != Transition::None {
            trace!("scroll-to-pinch {:?} -> {:?}", transition, self.recognizer.state());
        }

        let state = *self.recognizer.state();
        if state == ScrollToPinchState::Mapping || transition == Transition::JustFinished {
            if event.phase == Phase::Other {
                return Vec::new();
            }
            let magnification = self.settings.sensitivity * f64::from(event.scroll_point_delta[0]);
            let mut pinch = synth::magnify(magnification, event.phase);
            pinch.flags = event.flags;
            return vec![pinch];
        }

        if state.is_dropping() || transition == Transition::JustFinishedDropping {
            return Vec::new();
        }

        vec![event]
    }
}
