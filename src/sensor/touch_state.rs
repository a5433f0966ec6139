//! Contact frame tracking
//!
//! [`TouchState`] is fed one frame per sensor report (surface and number of
//! fingers touching) and keeps enough history to answer the
//! [`TouchSensor`] queries:
//!
//! - a *tap* is a contact that lifts within [`TAP_MAX_DURATION`] of touching
//!   down; its finger count is the largest count seen during the contact
//! - a trackpad contact that starts within [`MULTI_TAP_WINDOW`] after a tap
//!   is a *double tap* if it uses the tap's finger count, and a *1.5-finger
//!   tap* if a one-finger tap is followed by a two-finger contact
//!
//! Frames arrive on the sensor thread while queries come from the event tap
//! thread, so the state sits behind a `parking_lot` lock. Trackpad taps are
//! announced through the registered tap callback, outside the lock.

use super::{Surface, TouchSensor};
use crate::time::timebase::{Duration, Timestamp};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Longest contact that still counts as a tap
pub const TAP_MAX_DURATION: Duration = Duration::from_millis(200);

/// Window after a tap in which a new contact continues the tap sequence
pub const MULTI_TAP_WINDOW: Duration = Duration::from_millis(300);

/// Callback invoked with the finger count of every trackpad tap
pub type TapCallback = Arc<dyn Fn(u32) + Send + Sync>;

/// Reads the current "Tap to click" setting
pub type PreferenceSource = Arc<dyn Fn() -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy)]
struct Tap {
    count: u32,
    ended: Timestamp,
}

#[derive(Debug, Clone, Copy)]
struct Contact {
    max_count: u32,
    started: Timestamp,
    /// Tap that ended shortly before this contact began
    preceding_tap: Option<Tap>,
}

#[derive(Debug, Default)]
struct SurfaceState {
    count: u32,
    contact: Option<Contact>,
    last_tap: Option<Tap>,
}

#[derive(Debug, Default)]
struct Inner {
    trackpad: SurfaceState,
    mousepad: SurfaceState,
    last_touch_count: u32,
}

impl Inner {
    fn surface(&self, surface: Surface) -> &SurfaceState {
        match surface {
            Surface::Trackpad => &self.trackpad,
            Surface::Mousepad => &self.mousepad,
        }
    }

    fn surface_mut(&mut self, surface: Surface) -> &mut SurfaceState {
        match surface {
            Surface::Trackpad => &mut self.trackpad,
            Surface::Mousepad => &mut self.mousepad,
        }
    }
}

/// Frame counters for diagnostics
#[derive(Debug, Default)]
pub struct TouchStats {
    /// Frames recorded
    pub frames: AtomicU64,
    /// Taps recognized on any surface
    pub taps: AtomicU64,
}

/// Touch history derived from contact frames
pub struct TouchState {
    inner: Mutex<Inner>,
    on_tap: RwLock<Option<TapCallback>>,
    tap_to_click: AtomicBool,
    tap_to_click_source: RwLock<Option<PreferenceSource>>,
    stats: TouchStats,
}

impl Default for TouchState {
    fn default() -> Self {
        Self::new()
    }
}

impl TouchState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            on_tap: RwLock::new(None),
            tap_to_click: AtomicBool::new(false),
            tap_to_click_source: RwLock::new(None),
            stats: TouchStats::default(),
        }
    }

    /// Register the callback for trackpad taps, replacing any previous one.
    pub fn set_tap_callback(&self, callback: impl Fn(u32) + Send + Sync + 'static) {
        *self.on_tap.write() = Some(Arc::new(callback));
    }

    pub fn set_tap_to_click(&self, enabled: bool) {
        self.tap_to_click.store(enabled, Ordering::Relaxed);
    }

    /// Read the "Tap to click" setting from `source` now and again on every
    /// trackpad tap, so changes made while running take effect.
    pub fn set_tap_to_click_source(&self, source: impl Fn() -> bool + Send + Sync + 'static) {
        let source: PreferenceSource = Arc::new(source);
        self.set_tap_to_click(source());
        *self.tap_to_click_source.write() = Some(source);
    }

    pub fn stats(&self) -> &TouchStats {
        &self.stats
    }

    /// Record the number of fingers touching `surface` at time `at`.
    pub fn record_frame(&self, surface: Surface, count: u32, at: Timestamp) {
        self.stats.frames.fetch_add(1, Ordering::Relaxed);

        let tap = {
            let mut inner = self.inner.lock();
            let state = inner.surface_mut(surface);
            let previous = std::mem::replace(&mut state.count, count);

            let mut tap = None;
            if previous == 0 && count > 0 {
                let preceding_tap = state
                    .last_tap
                    .filter(|tap| at.duration_since(tap.ended) <= MULTI_TAP_WINDOW);
                state.contact = Some(Contact {
                    max_count: count,
                    started: at,
                    preceding_tap,
                });
            } else if count > 0 {
                if let Some(contact) = state.contact.as_mut() {
                    contact.max_count = contact.max_count.max(count);
                }
            } else if previous > 0 {
                if let Some(contact) = state.contact.take() {
                    state.last_tap = (at.duration_since(contact.started) <= TAP_MAX_DURATION).then_some(Tap {
                        count: contact.max_count,
                        ended: at,
                    });
                    tap = state.last_tap;
                }
            }

            let last = state.contact.map(|c| c.max_count).or(tap.map(|t| t.count));
            if let Some(last) = last {
                inner.last_touch_count = last;
            }
            tap
        };

        if let Some(tap) = tap {
            self.stats.taps.fetch_add(1, Ordering::Relaxed);
            trace!("{}-finger tap on {:?}", tap.count, surface);
            if surface == Surface::Trackpad {
                let source = self.tap_to_click_source.read().clone();
                if let Some(source) = source {
                    self.set_tap_to_click(source());
                }
                let callback = self.on_tap.read().clone();
                if let Some(callback) = callback {
                    callback(tap.count);
                }
            }
        }
    }
}

impl TouchSensor for TouchState {
    fn touch_count(&self, surface: Surface) -> u32 {
        self.inner.lock().surface(surface).count
    }

    fn last_touch_count(&self) -> u32 {
        self.inner.lock().last_touch_count
    }

    fn is_one_and_a_half_tap(&self) -> bool {
        let inner = self.inner.lock();
        inner.trackpad.contact.is_some_and(|contact| {
            contact.max_count == 2 && contact.preceding_tap.is_some_and(|tap| tap.count == 1)
        })
    }

    fn is_double_tap(&self) -> bool {
        let inner = self.inner.lock();
        inner.trackpad.contact.is_some_and(|contact| {
            contact
                .preceding_tap
                .is_some_and(|tap| tap.count == contact.max_count)
        })
    }

    fn tap_to_click_enabled(&self) -> bool {
        self.tap_to_click.load(Ordering::Relaxed)
    }
}
