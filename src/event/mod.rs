//! Event model
//!
//! The engine's representation of Quartz input events and the constructors
//! for synthetic events emitted by the mappings.

pub mod flags;
pub mod synth;
pub mod types;

pub use flags::EventFlags;
pub use types::{ChangedFields, Event, EventSubtype, EventType, MouseButton, Phase, ScrollUnit};
