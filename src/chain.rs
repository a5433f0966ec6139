//! Mapping chain and dispatcher
//!
//! [`MappingChain`] runs an event through its mappings in order. Every
//! output of one mapping is fed to the next, and the outputs are
//! concatenated in order, so chain order alone decides which mapping sees
//! an event first.
//!
//! [`Dispatcher`] sits between the event source (the tap, or a replay
//! script) and the chain: it picks the time used for timing windows,
//! handles tap-disabled notifications and logs the input/output
//! correlation when asked to.

use crate::event::{Event, EventType};
use crate::mapping::{MapContext, Mapping, MappingSettings};
use crate::sensor::TouchSensor;
use crate::time::timebase::Timestamp;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Source of the "now" used by timing windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimingSource {
    /// The event's own timestamp
    #[default]
    Event,
    /// The monotonic clock when the event is processed
    Monotonic,
}

/// Ordered list of mappings
#[derive(Debug, Clone, Default)]
pub struct MappingChain {
    mappings: Vec<Mapping>,
}

impl MappingChain {
    pub fn new(mappings: Vec<Mapping>) -> Self {
        Self { mappings }
    }

    /// Build fresh mappings for each settings entry, in order.
    pub fn from_settings(settings: &[MappingSettings]) -> Self {
        Self::new(settings.iter().map(MappingSettings::build).collect())
    }

    /// Append a stage at the end of the chain.
    pub fn push(&mut self, mapping: Mapping) {
        self.mappings.push(mapping);
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.mappings.iter().map(Mapping::name).collect()
    }

    /// Feed one event through every mapping.
    pub fn process(&mut self, event: Event, ctx: &MapContext<'_>) -> Vec<Event> {
        let mut events = vec![event];
        for mapping in &mut self.mappings {
            if events.is_empty() {
                break;
            }
            events = events
                .into_iter()
                .flat_map(|event| mapping.map(event, ctx))
                .collect();
        }
        events
    }

    /// Deliver a discrete trackpad tap to every mapping.
    pub fn on_trackpad_tap(&mut self, ctx: &MapContext<'_>, location: (f64, f64)) -> Vec<Event> {
        self.mappings
            .iter_mut()
            .flat_map(|mapping| mapping.on_trackpad_tap(ctx, location))
            .collect()
    }
}

/// Counters kept by the dispatcher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events received
    pub events_in: u64,
    /// Events emitted
    pub events_out: u64,
    /// Events for which nothing was emitted
    pub events_dropped: u64,
    /// Tap-disabled notifications handled
    pub tap_reenabled: u64,
}

/// Owned callback that re-enables the event tap
pub type ReenableCallback = Box<dyn FnMut() + Send>;

/// Entry point for events coming from the tap
pub struct Dispatcher {
    chain: MappingChain,
    sensor: Arc<dyn TouchSensor>,
    timing: TimingSource,
    log_events: bool,
    reenable: Option<ReenableCallback>,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new(chain: MappingChain, sensor: Arc<dyn TouchSensor>) -> Self {
        Self {
            chain,
            sensor,
            timing: TimingSource::default(),
            log_events: false,
            reenable: None,
            stats: DispatchStats::default(),
        }
    }

    pub fn with_timing(mut self, timing: TimingSource) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_event_logging(mut self, log_events: bool) -> Self {
        self.log_events = log_events;
        self
    }

    /// Set the callback invoked when the tap reports it was disabled.
    pub fn set_reenable_callback(&mut self, callback: impl FnMut() + Send + 'static) {
        self.reenable = Some(Box::new(callback));
    }

    /// Replace the active chain, e.g. when the frontmost application changes.
    /// Gesture state of the old chain is discarded.
    pub fn set_chain(&mut self, chain: MappingChain) {
        debug!("Active chain: {}", chain.names().join(" -> "));
        self.chain = chain;
    }

    pub fn chain(&self) -> &MappingChain {
        &self.chain
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Process one event from the tap. The returned events replace it, in
    /// order; an empty result drops it.
    pub fn process(&mut self, event: Event) -> Vec<Event> {
        if event.event_type.is_tap_disabled() {
            warn!("Event tap disabled ({:?}), re-enabling", event.event_type);
            self.stats.tap_reenabled += 1;
            if let Some(reenable) = self.reenable.as_mut() {
                reenable();
            }
            return Vec::new();
        }

        let now = match self.timing {
            TimingSource::Event => event.timestamp,
            TimingSource::Monotonic => Timestamp::now(),
        };
        let ctx = MapContext {
            sensor: self.sensor.as_ref(),
            now,
        };

        let input = self.log_events.then(|| event.clone());
        let output = self.chain.process(event, &ctx);

        self.stats.events_in += 1;
        self.stats.events_out += output.len() as u64;
        if output.is_empty() {
            self.stats.events_dropped += 1;
        }

        if let Some(input) = input {
            debug!("{:?} -> {:?}", input, output);
        } else {
            trace!("{} event(s) out", output.len());
        }
        output
    }

    /// Handle a discrete trackpad tap at the pointer `location`. The
    /// returned events are to be posted as new input.
    pub fn on_trackpad_tap(&mut self, location: (f64, f64)) -> Vec<Event> {
        let ctx = MapContext {
            sensor: self.sensor.as_ref(),
            now: Timestamp::now(),
        };
        let output = self.chain.on_trackpad_tap(&ctx, location);
        if self.log_events && !output.is_empty() {
            debug!("tap at {:?} -> {:?}", location, output);
        }
        output
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("chain", &self.chain.names())
            .field("timing", &self.timing)
            .field("log_events", &self.log_events)
            .field("stats", &self.stats)
            .finish()
    }
}

/// Whether the tap should be asked for events of this type
pub fn is_handled_type(event_type: EventType) -> bool {
    matches!(event_type, EventType::ScrollWheel | EventType::Gesture)
        || (event_type.is_mouse() && event_type != EventType::MouseMoved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::synth;
    use crate::event::{EventFlags, Phase};
    use crate::mapping::PinchSettings;
    use crate::sensor::{StaticSensor, Surface};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_empty_chain_is_identity() {
        let mut dispatcher = Dispatcher::new(MappingChain::default(), Arc::new(StaticSensor::new()));
        let event = synth::magnify(0.3, Phase::Changed);
        assert_eq!(dispatcher.process(event.clone()), vec![event]);
    }

    #[test]
    fn test_tap_disabled_only_reenables() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let chain = MappingChain::from_settings(&[MappingSettings::Pinch(PinchSettings::default_wheel())]);
        let mut dispatcher = Dispatcher::new(chain, Arc::new(StaticSensor::new()));
        dispatcher.set_reenable_callback(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        let out = dispatcher.process(Event::new(EventType::TapDisabledByTimeout, Timestamp::default()));
        assert!(out.is_empty());
        let out = dispatcher.process(Event::new(EventType::TapDisabledByUserInput, Timestamp::default()));
        assert!(out.is_empty());

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(dispatcher.stats().tap_reenabled, 2);
        assert_eq!(dispatcher.stats().events_in, 0);
    }

    #[test]
    fn test_stats_count_drops() {
        let chain = MappingChain::from_settings(&[MappingSettings::Pinch(PinchSettings::default_wheel())]);
        let mut dispatcher = Dispatcher::new(chain, Arc::new(StaticSensor::new()));

        // below one wheel step: dropped
        assert!(dispatcher.process(synth::magnify(0.001, Phase::Began)).is_empty());
        // 0.2 + 0.6 rounds to one step
        assert_eq!(dispatcher.process(synth::magnify(0.003, Phase::Changed)).len(), 3);

        let stats = dispatcher.stats();
        assert_eq!(stats.events_in, 2);
        assert_eq!(stats.events_out, 3);
        assert_eq!(stats.events_dropped, 1);
    }

    #[test]
    fn test_set_chain_replaces_stages() {
        let mut dispatcher = Dispatcher::new(MappingChain::default(), Arc::new(StaticSensor::new()));
        dispatcher.set_chain(MappingChain::from_settings(&[
            MappingSettings::middle_click(),
            MappingSettings::Pinch(PinchSettings::pinch_to_pinch(EventFlags::SHIFT, 1.0)),
        ]));
        assert_eq!(dispatcher.chain().names(), vec!["middle_click", "pinch"]);

        let out = dispatcher.process(synth::magnify(0.1, Phase::Began));
        assert_eq!(out[0].flags, EventFlags::SHIFT);
    }

    /// Two-finger swipe, fingers lifted, then a plain scroll stamped 10s later
    fn scroll_after_pinch(timing: TimingSource) -> Vec<Event> {
        let sensor = Arc::new(StaticSensor::new());
        sensor.set_touch_count(Surface::Mousepad, 2);
        let chain = MappingChain::from_settings(&[MappingSettings::magic_mouse_zoom()]);
        let mut dispatcher = Dispatcher::new(chain, sensor.clone()).with_timing(timing);

        let scroll = |phase: Phase, millis: u64| {
            let mut event = Event::new(EventType::ScrollWheel, Timestamp::from_millis(millis));
            event.phase = phase;
            event.scroll_point_delta = [4, 0, 0];
            event
        };
        assert_eq!(dispatcher.process(scroll(Phase::Began, 0)).len(), 1);
        assert_eq!(dispatcher.process(scroll(Phase::Ended, 10)).len(), 1);

        sensor.set_touch_count(Surface::Mousepad, 0);
        dispatcher.process(scroll(Phase::Other, 10_000))
    }

    #[test]
    fn test_event_timing_uses_event_timestamps() {
        // the grace window has passed according to the event stream
        assert_eq!(scroll_after_pinch(TimingSource::Event).len(), 1);
    }

    #[test]
    fn test_monotonic_timing_ignores_event_timestamps() {
        // only microseconds of clock time have passed, so the grace window holds
        assert!(scroll_after_pinch(TimingSource::Monotonic).is_empty());
    }

    #[test]
    fn test_handled_types() {
        assert!(is_handled_type(EventType::ScrollWheel));
        assert!(is_handled_type(EventType::Gesture));
        assert!(is_handled_type(EventType::OtherMouseDragged));
        assert!(!is_handled_type(EventType::MouseMoved));
        assert!(!is_handled_type(EventType::KeyDown));
    }
}
