//! Key chord definitions
//!
//! A chord is a physical key code plus a modifier bitset. Modifier bits use
//! the Carbon values so persisted settings stay readable by older builds.

use std::fmt;
use std::ops::BitOr;

#[cfg(target_os = "macos")]
use core_graphics::event::{CGEvent, CGEventFlags, EventField};
use serde::{Deserialize, Serialize};

/// Modifier bitset over Control, Option, Shift and Command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Modifiers(u32);

impl Modifiers {
    /// No modifier held
    pub const NONE: Self = Self(0);
    /// Command key (Carbon `cmdKey`)
    pub const COMMAND: Self = Self(0x0100);
    /// Shift key (Carbon `shiftKey`)
    pub const SHIFT: Self = Self(0x0200);
    /// Option/Alt key (Carbon `optionKey`)
    pub const OPTION: Self = Self(0x0800);
    /// Control key (Carbon `controlKey`)
    pub const CONTROL: Self = Self(0x1000);

    #[cfg(test)]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every bit of `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Build the bitset from the flags of a live event
    #[cfg(target_os = "macos")]
    pub fn from_flags(flags: CGEventFlags) -> Self {
        let mut modifiers = Self::NONE;
        if flags.contains(CGEventFlags::CGEventFlagControl) {
            modifiers = modifiers | Self::CONTROL;
        }
        if flags.contains(CGEventFlags::CGEventFlagAlternate) {
            modifiers = modifiers | Self::OPTION;
        }
        if flags.contains(CGEventFlags::CGEventFlagShift) {
            modifiers = modifiers | Self::SHIFT;
        }
        if flags.contains(CGEventFlags::CGEventFlagCommand) {
            modifiers = modifiers | Self::COMMAND;
        }
        modifiers
    }
}

impl BitOr for Modifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A physical key plus modifiers, compared by exact equality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chord {
    /// macOS virtual key code
    pub key_code: u32,
    pub modifiers: Modifiers,
}

impl Chord {
    pub const fn new(key_code: u32, modifiers: Modifiers) -> Self {
        Self {
            key_code,
            modifiers,
        }
    }

    /// Read the chord out of a key-down event
    #[cfg(target_os = "macos")]
    pub fn from_event(event: &CGEvent) -> Self {
        let key_code = event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE) as u32;
        Self::new(key_code, Modifiers::from_flags(event.get_flags()))
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const GLYPHS: [(Modifiers, &str); 4] = [
            (Modifiers::CONTROL, "⌃"),
            (Modifiers::OPTION, "⌥"),
            (Modifiers::SHIFT, "⇧"),
            (Modifiers::COMMAND, "⌘"),
        ];

        for (modifier, glyph) in GLYPHS {
            if self.modifiers.contains(modifier) {
                f.write_str(glyph)?;
            }
        }

        match key_name(self.key_code) {
            Some(name) => f.write_str(name),
            None => write!(f, "#{}", self.key_code),
        }
    }
}

/// Human-readable name for an ANSI-layout virtual key code
pub fn key_name(key_code: u32) -> Option<&'static str> {
    let name = match key_code {
        0 => "A",
        1 => "S",
        2 => "D",
        3 => "F",
        4 => "H",
        5 => "G",
        6 => "Z",
        7 => "X",
        8 => "C",
        9 => "V",
        11 => "B",
        12 => "Q",
        13 => "W",
        14 => "E",
        15 => "R",
        16 => "Y",
        17 => "T",
        18 => "1",
        19 => "2",
        20 => "3",
        21 => "4",
        22 => "6",
        23 => "5",
        24 => "=",
        25 => "9",
        26 => "7",
        27 => "-",
        28 => "8",
        29 => "0",
        30 => "]",
        31 => "O",
        32 => "U",
        33 => "[",
        34 => "I",
        35 => "P",
        37 => "L",
        38 => "J",
        39 => "'",
        40 => "K",
        41 => ";",
        42 => "\\",
        43 => ",",
        44 => "/",
        45 => "N",
        46 => "M",
        47 => ".",
        48 => "Tab",
        49 => "Space",
        50 => "`",
        51 => "Delete",
        53 => "Esc",
        96 => "F5",
        97 => "F6",
        98 => "F7",
        99 => "F3",
        100 => "F8",
        101 => "F9",
        103 => "F11",
        105 => "F13",
        107 => "F14",
        109 => "F10",
        111 => "F12",
        113 => "F15",
        118 => "F4",
        120 => "F2",
        122 => "F1",
        123 => "←",
        124 => "→",
        125 => "↓",
        126 => "↑",
        _ => return None,
    };
    Some(name)
}
