//! Modifier flags
//!
//! [`EventFlags`] mirrors `CGEventFlags`. The device independent modifier
//! masks live in bits 16..24; the low byte carries left/right hand
//! distinctions which preset matching ignores (see [`EventFlags::purified`]).
//!
//! Flags are written in configuration files as `+`-joined names, e.g.
//! `"command+shift"`, or `"none"` for the empty set.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// `CGEventFlags` bitset
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    pub struct EventFlags: u64 {
        /// Caps lock
        const ALPHA_SHIFT = 0x0001_0000;
        const SHIFT = 0x0002_0000;
        const CONTROL = 0x0004_0000;
        /// Option
        const ALTERNATE = 0x0008_0000;
        const COMMAND = 0x0010_0000;
        const NUMERIC_PAD = 0x0020_0000;
        const HELP = 0x0040_0000;
        /// Fn
        const SECONDARY_FN = 0x0080_0000;
        const NON_COALESCED = 0x0000_0100;

        // Device dependent bits and anything else the OS sets are retained.
        const _ = !0;
    }
}

/// Device independent modifier bits
const PURE_MASK: u64 = 0x00FF_0000;

const NAMES: &[(&str, EventFlags)] = &[
    ("shift", EventFlags::SHIFT),
    ("control", EventFlags::CONTROL),
    ("option", EventFlags::ALTERNATE),
    ("command", EventFlags::COMMAND),
    ("capslock", EventFlags::ALPHA_SHIFT),
    ("fn", EventFlags::SECONDARY_FN),
    ("numpad", EventFlags::NUMERIC_PAD),
    ("help", EventFlags::HELP),
    ("noncoalesced", EventFlags::NON_COALESCED),
];

impl EventFlags {
    /// Keep only the device independent modifier keys, dropping left/right
    /// hand bits and non-modifier markers.
    pub fn purified(self) -> EventFlags {
        EventFlags::from_bits_retain(self.bits() & PURE_MASK)
    }
}

impl fmt::Display for EventFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }

        let mut rest = self.bits();
        let mut parts: Vec<String> = Vec::new();
        for (name, flag) in NAMES {
            if self.contains(*flag) {
                parts.push((*name).to_string());
                rest &= !flag.bits();
            }
        }
        if rest != 0 {
            parts.push(format!("{rest:#x}"));
        }
        write!(f, "{}", parts.join("+"))
    }
}

impl FromStr for EventFlags {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("none") {
            return Ok(EventFlags::empty());
        }

        let mut flags = EventFlags::empty();
        for part in s.split('+') {
            let part = part.trim().to_ascii_lowercase();
            let flag = match part.as_str() {
                "shift" => EventFlags::SHIFT,
                "control" | "ctrl" => EventFlags::CONTROL,
                "option" | "alt" | "alternate" => EventFlags::ALTERNATE,
                "command" | "cmd" => EventFlags::COMMAND,
                "capslock" | "caps" => EventFlags::ALPHA_SHIFT,
                "fn" | "function" => EventFlags::SECONDARY_FN,
                "numpad" => EventFlags::NUMERIC_PAD,
                "help" => EventFlags::HELP,
                "noncoalesced" => EventFlags::NON_COALESCED,
                hex if hex.starts_with("0x") => u64::from_str_radix(&hex[2..], 16)
                    .map(EventFlags::from_bits_retain)
                    .map_err(|_| format!("invalid flag value: {part}"))?,
                raw => raw
                    .parse::<u64>()
                    .map(EventFlags::from_bits_retain)
                    .map_err(|_| format!("unknown modifier: {part}"))?,
            };
            flags |= flag;
        }
        Ok(flags)
    }
}

impl Serialize for EventFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
