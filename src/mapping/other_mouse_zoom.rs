//! Extra button held: scroll or drag to zoom
//!
//! While the configured button is held, scrolling (trigger `scroll`) or
//! dragging (trigger `drag`) produces a magnify gesture instead. When the
//! gesture never materializes the physical click is passed on, possibly late
//! if clicks are deferred.

use super::MapContext;
use crate::event::synth;
use crate::event::{Event, EventType, MouseButton, Phase};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// What turns a held button into a zoom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ZoomTrigger {
    #[default]
    Scroll,
    Drag,
}

/// Settings of [`OtherMouseZoomMapping`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtherMouseZoomSettings {
    pub button: MouseButton,
    /// Hold back the button down until it is clear no zoom follows
    pub defer_clicks: bool,
    /// Magnification per scrolled pixel or dragged point
    pub sensitivity: f64,
    pub trigger: ZoomTrigger,
    /// Drag distance that starts a zoom (drag trigger)
    pub min_drag_distance: f64,
}

impl Default for OtherMouseZoomSettings {
    fn default() -> Self {
        Self {
            button: MouseButton::CENTER,
            defer_clicks: false,
            sensitivity: 0.003,
            trigger: ZoomTrigger::Scroll,
            min_drag_distance: 4.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OtherMouseZoomMapping {
    settings: OtherMouseZoomSettings,
    click_location: Option<(f64, f64)>,
    deferred_click: Option<Event>,
    zooming: bool,
    drag_travel: f64,
}

impl OtherMouseZoomMapping {
    pub fn new(settings: OtherMouseZoomSettings) -> Self {
        Self {
            settings,
            click_location: None,
            deferred_click: None,
            zooming: false,
            drag_travel: 0.0,
        }
    }

    pub fn settings(&self) -> &OtherMouseZoomSettings {
        &self.settings
    }

    pub fn is_zooming(&self) -> bool {
        self.zooming
    }

    pub fn map(&mut self, event: Event, _ctx: &MapContext<'_>) -> Vec<Event> {
        let own_button = event.mouse_button == self.settings.button;

        if event.event_type == EventType::OtherMouseDown && own_button {
            self.click_location = Some(event.location);
            self.drag_travel = 0.0;
            if self.settings.defer_clicks {
                self.deferred_click = Some(event);
                return Vec::new();
            }
            return vec![event];
        }

        let Some(click_location) = self.click_location else {
            return vec![event];
        };

        match (self.settings.trigger, event.event_type) {
            (ZoomTrigger::Scroll, EventType::ScrollWheel) => self.scroll_zoom(event, click_location),
            (ZoomTrigger::Scroll, EventType::OtherMouseDragged) if own_button => {
                self.click_location = Some(event.location);
                if let Some(deferred) = self.deferred_click.take() {
                    vec![deferred, event]
                } else if self.zooming {
                    // dragging after a zoom continues as a fresh click-drag
                    self.zooming = false;
                    let mut out = vec![self.magnify(0.0, Phase::Ended, &event)];
                    out.extend(self.button(EventType::OtherMouseDown, click_location));
                    out.push(event);
                    out
                } else {
                    vec![event]
                }
            }
            (ZoomTrigger::Drag, EventType::OtherMouseDragged) if own_button => {
                self.drag_zoom(event, click_location)
            }
            (_, EventType::OtherMouseUp) if own_button => {
                self.click_location = None;
                if self.zooming {
                    self.zooming = false;
                    self.deferred_click = None;
                    vec![self.magnify(0.0, Phase::Ended, &event)]
                } else if let Some(deferred) = self.deferred_click.take() {
                    vec![deferred, event]
                } else {
                    vec![event]
                }
            }
            _ => vec![event],
        }
    }

    fn scroll_zoom(&mut self, event: Event, click_location: (f64, f64)) -> Vec<Event> {
        let delta = event.scroll_point_delta[0];
        if delta == 0 {
            return Vec::new();
        }

        let zoom = self.settings.sensitivity * f64::from(delta);
        if self.zooming {
            return vec![self.magnify(zoom, Phase::Changed, &event)];
        }

        self.zooming = true;
        trace!("zoom started by scroll");
        let mut out = Vec::with_capacity(2);
        if self.deferred_click.take().is_none() {
            // the down already went out
            out.extend(self.button(EventType::OtherMouseUp, click_location));
        }
        out.push(self.magnify(zoom, Phase::Began, &event));
        out
    }

    fn drag_zoom(&mut self, event: Event, click_location: (f64, f64)) -> Vec<Event> {
        let (dx, dy) = event.mouse_delta;
        // dragging up zooms in
        let zoom = -self.settings.sensitivity * dy as f64;

        if self.zooming {
            return vec![self.magnify(zoom, Phase::Changed, &event)];
        }

        self.drag_travel += (dx as f64).hypot(dy as f64);
        if self.drag_travel < self.settings.min_drag_distance {
            return if self.deferred_click.is_some() {
                Vec::new()
            } else {
                vec![event]
            };
        }

        self.zooming = true;
        trace!("zoom started by drag after {:.1} points", self.drag_travel);
        let mut out = Vec::with_capacity(2);
        if self.deferred_click.take().is_none() {
            out.extend(self.button(EventType::OtherMouseUp, click_location));
        }
        out.push(self.magnify(zoom, Phase::Began, &event));
        out
    }

    fn magnify(&self, magnification: f64, phase: Phase, source: &Event) -> Event {
        synth::magnify(magnification, phase).with_flags(source.flags)
    }

    fn button(&self, event_type: EventType, location: (f64, f64)) -> Option<Event> {
        let event = synth::mouse(event_type, location, self.settings.button);
        if event.is_none() {
            warn!("cannot create {:?} at {:?}", event_type, location);
        }
        event
    }
}
