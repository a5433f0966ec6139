//! # Pinchbar
//!
//! A system-wide input remapping engine for macOS. Scroll, click, drag and
//! gesture events are intercepted with a Quartz event tap and rewritten by an
//! ordered chain of stateful mappings: two-finger Magic Mouse scrolls become
//! pinches, pinches become wheel steps or key presses, three-finger clicks
//! become middle clicks, and so on.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use pinchbar::chain::{Dispatcher, MappingChain};
//! use pinchbar::event::{synth, Phase};
//! use pinchbar::mapping::{MappingSettings, PinchSettings};
//! use pinchbar::sensor::StaticSensor;
//!
//! let chain = MappingChain::from_settings(&[
//!     MappingSettings::magic_mouse_zoom(),
//!     MappingSettings::Pinch(PinchSettings::default_wheel()),
//! ]);
//! let mut dispatcher = Dispatcher::new(chain, Arc::new(StaticSensor::new()));
//!
//! let output = dispatcher.process(synth::magnify(0.01, Phase::Began));
//! println!("{:?}", output);
//! ```
//!
//! ## Architecture
//!
//! - [`event`]: Event model, modifier flags and synthetic event constructors
//! - [`time`]: Monotonic timestamps based on mach_absolute_time
//! - [`sensor`]: Touch sensor trait, tap detection and the multitouch feed
//! - [`mapping`]: Gesture recognizers and the mappings built on them
//! - [`chain`]: Mapping chain and the dispatcher fed by the tap
//! - [`preset`]: Per-application pinch presets
//! - [`replay`]: JSON-lines replay of recorded event scripts
//! - `tap`: Quartz event tap adapter (macOS only)
//! - [`app`]: CLI and configuration management
//!
//! ## Event Pipeline
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │  CGEventTap │───▶│ Dispatcher  │───▶│  Mapping 1  │───▶│  Mapping k  │
//! │    (tap)    │    │             │    │     ...     │    │  (preset)   │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//!        ▲                                                        │
//!        └────────────────── posted / returned events ◀───────────┘
//! ```
//!
//! ## Permissions
//!
//! Installing the event tap requires Accessibility permissions on macOS:
//! System Settings → Privacy & Security → Accessibility

pub mod app;
pub mod chain;
pub mod event;
pub mod mapping;
pub mod preset;
pub mod replay;
pub mod sensor;
#[cfg(target_os = "macos")]
pub mod tap;
pub mod time;

// Re-export commonly used types
pub use chain::{Dispatcher, MappingChain, TimingSource};
pub use event::{Event, EventFlags, EventType, Phase};
pub use mapping::{Mapping, MappingSettings};
pub use preset::Preset;
pub use time::timebase::MachTimebase;

/// Result type alias for pinchbar
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for pinchbar
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Event tap error: {0}")]
    Tap(String),

    #[error("Touch sensor error: {0}")]
    Sensor(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Replay error: {0}")]
    Replay(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
