//! Per-application presets
//!
//! A preset maps purified modifier flags to pinch settings. The preset stage
//! at the end of a chain picks the entry matching a pinch's flags exactly;
//! pinches without a matching entry pass through.

use crate::event::{Event, EventFlags};
use crate::mapping::{validate_pinch, MapContext, PinchMapping, PinchSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key codes used by the built-in presets
mod key {
    /// `g` (ANSI)
    pub const G: u16 = 5;
    /// `h` (ANSI)
    pub const H: u16 = 4;
    pub const MINUS_DE: u16 = 44;
    pub const PLUS_DE: u16 = 30;
}

/// Flags to pinch settings table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preset {
    pub mappings: BTreeMap<EventFlags, PinchSettings>,
}

impl Preset {
    pub fn new(entries: impl IntoIterator<Item = (EventFlags, PinchSettings)>) -> Self {
        Self {
            mappings: entries.into_iter().collect(),
        }
    }

    /// Settings for a pinch carrying `flags`
    pub fn lookup(&self, flags: EventFlags) -> Option<&PinchSettings> {
        let flags = flags.purified();
        self.mappings
            .iter()
            .find(|(key, _)| key.purified() == flags)
            .map(|(_, settings)| settings)
    }

    /// Cubase: plain pinch zooms with command-wheel, option and command
    /// pinches step the zoom with G/H.
    pub fn cubase() -> Self {
        Self::new([
            (EventFlags::empty(), PinchSettings::default_wheel()),
            (
                EventFlags::ALTERNATE,
                PinchSettings::pinch_to_keys(key::G, key::H, EventFlags::ALTERNATE, 5.0),
            ),
            (
                EventFlags::COMMAND,
                PinchSettings::pinch_to_keys(key::G, key::H, EventFlags::SHIFT, 5.0),
            ),
        ])
    }

    /// Plain pinch changes the font size, command-pinch stays a pinch.
    pub fn font_size() -> Self {
        Self::new([
            (
                EventFlags::empty(),
                PinchSettings::pinch_to_keys(key::MINUS_DE, key::PLUS_DE, EventFlags::COMMAND, 5.0),
            ),
            (EventFlags::COMMAND, PinchSettings::default()),
        ])
    }

    /// Command-pinch changes the font size, plain pinch stays a pinch.
    pub fn font_size_cmd() -> Self {
        Self::new([
            (EventFlags::empty(), PinchSettings::default()),
            (
                EventFlags::COMMAND,
                PinchSettings::pinch_to_keys(key::MINUS_DE, key::PLUS_DE, EventFlags::COMMAND, 5.0),
            ),
        ])
    }

    /// Presets shipped with the application
    pub fn builtin() -> BTreeMap<String, Preset> {
        BTreeMap::from([
            ("Cubase".to_string(), Self::cubase()),
            ("Font Size".to_string(), Self::font_size()),
            ("Font Size/cmd".to_string(), Self::font_size_cmd()),
        ])
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut seen: BTreeMap<EventFlags, EventFlags> = BTreeMap::new();
        for (flags, settings) in &self.mappings {
            validate_pinch(settings).map_err(|e| format!("[{flags}] {e}"))?;
            // keys that purify alike would collapse into one preset stage entry
            if let Some(earlier) = seen.insert(flags.purified(), *flags) {
                return Err(format!(
                    "[{flags}] and [{earlier}] select the same modifiers ({:#x})",
                    flags.purified().bits()
                ));
            }
        }
        Ok(())
    }
}

/// Preset stage of a chain. Each flag combination gets its own pinch
/// mapping so residues of different gestures do not mix.
#[derive(Debug, Clone)]
pub struct PresetMapping {
    name: String,
    mappings: BTreeMap<EventFlags, PinchMapping>,
}

impl PresetMapping {
    pub fn new(name: impl Into<String>, preset: &Preset) -> Self {
        let mappings = preset
            .mappings
            .iter()
            .map(|(flags, settings)| (flags.purified(), PinchMapping::new(settings.clone())))
            .collect();
        Self {
            name: name.into(),
            mappings,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn map(&mut self, event: Event, ctx: &MapContext<'_>) -> Vec<Event> {
        if !event.is_magnify() {
            return vec![event];
        }
        match self.mappings.get_mut(&event.purified_flags()) {
            Some(mapping) => mapping.map(event, ctx),
            None => vec![event],
        }
    }
}
