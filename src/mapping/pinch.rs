//! Pinch to pinch, wheel or keys
//!
//! Without a replacement the pinch is rescaled and re-flagged. With a
//! replacement the magnification is integrated into whole steps; the
//! fractional residue carries over to the next event of the gesture so slow
//! pinches still produce output.

use super::MapContext;
use crate::event::synth;
use crate::event::{Event, EventFlags, Phase, ScrollUnit};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What a pinch is replaced with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Replacement {
    /// Pixel scroll wheel steps
    Wheel,
    /// `code_a` for pinching in, `code_b` for pinching out
    Keys { code_a: u16, code_b: u16 },
}

/// Settings of [`PinchMapping`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinchSettings {
    /// Modifier flags the output carries
    pub flags: EventFlags,
    /// Factor applied to the magnification
    pub sensitivity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace_with: Option<Replacement>,
}

impl Default for PinchSettings {
    fn default() -> Self {
        Self::pinch_to_pinch(EventFlags::empty(), 1.0)
    }
}

impl PinchSettings {
    pub fn pinch_to_pinch(flags: EventFlags, sensitivity: f64) -> Self {
        Self {
            flags,
            sensitivity,
            replace_with: None,
        }
    }

    pub fn pinch_to_wheel(flags: EventFlags, sensitivity: f64) -> Self {
        Self {
            flags,
            sensitivity,
            replace_with: Some(Replacement::Wheel),
        }
    }

    pub fn pinch_to_keys(code_a: u16, code_b: u16, flags: EventFlags, sensitivity: f64) -> Self {
        Self {
            flags,
            sensitivity,
            replace_with: Some(Replacement::Keys { code_a, code_b }),
        }
    }

    /// Command-wheel zoom with the usual sensitivity
    pub fn default_wheel() -> Self {
        Self::pinch_to_wheel(EventFlags::COMMAND, 200.0)
    }

    /// Command with key codes 44 and 30 (`-` and `+` on German layouts)
    pub fn default_keys() -> Self {
        Self::pinch_to_keys(44, 30, EventFlags::COMMAND, 5.0)
    }
}

/// Rewrites magnify gestures
#[derive(Debug, Clone)]
pub struct PinchMapping {
    settings: PinchSettings,
    residue: f64,
}

impl PinchMapping {
    pub fn new(settings: PinchSettings) -> Self {
        Self { settings, residue: 0.0 }
    }

    pub fn settings(&self) -> &PinchSettings {
        &self.settings
    }

    /// Fractional magnification not yet emitted
    pub fn residue(&self) -> f64 {
        self.residue
    }

    pub fn map(&mut self, mut event: Event, _ctx: &MapContext<'_>) -> Vec<Event> {
        if !event.is_magnify() {
            return vec![event];
        }

        let Some(replacement) = &self.settings.replace_with else {
            event.magnification *= self.settings.sensitivity;
            event.flags = self.settings.flags;
            return vec![event];
        };

        if event.phase == Phase::Began {
            self.residue = 0.0;
        }

        let total = self.settings.sensitivity * event.magnification + self.residue;
        let step = total.round();
        self.residue = total - step;

        if step == 0.0 {
            return if event.phase == Phase::Ended {
                vec![synth::flags_changed(event.flags)]
            } else {
                Vec::new()
            };
        }

        let flags = self.settings.flags;
        match replacement {
            Replacement::Wheel => {
                let Some(mut wheel) = synth::scroll_wheel(ScrollUnit::Pixel, &[step as i32]) else {
                    warn!("cannot create wheel event for step {}", step);
                    return Vec::new();
                };
                wheel.flags = flags;
                vec![synth::flags_changed(flags), wheel, synth::flags_changed(event.flags)]
            }
            Replacement::Keys { code_a, code_b } => {
                let code = if step < 0.0 { *code_a } else { *code_b };
                vec![
                    synth::flags_changed(flags),
                    synth::keyboard(code, true).with_flags(flags),
                    synth::keyboard(code, false).with_flags(flags),
                    synth::flags_changed(event.flags),
                ]
            }
        }
    }
}
