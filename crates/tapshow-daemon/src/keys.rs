//! Key names and modifier tracking
//!
//! Scancodes are resolved to short display names through a static table.
//! Codes without an entry are not shown at all, which also filters out
//! buttons and vendor keys that only some devices report.

use std::fmt;

use bitflags::bitflags;
use evdev::Key;

/// Normalized modifier key representation.
///
/// Left and right variants share one modifier, so both Ctrl keys display
/// as `Ctrl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    /// Control key (left or right)
    Ctrl,
    /// Shift key (left or right)
    Shift,
    /// Alt key (left or right)
    Alt,
    /// Super/Meta/Windows key (left or right)
    Super,
}

impl Modifier {
    /// Order in which held modifiers are rendered in a combo
    pub const DISPLAY_ORDER: [Modifier; 4] =
        [Modifier::Ctrl, Modifier::Alt, Modifier::Shift, Modifier::Super];

    /// Check if an evdev key is a modifier and return its normalized form.
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::KEY_LEFTCTRL | Key::KEY_RIGHTCTRL => Some(Modifier::Ctrl),
            Key::KEY_LEFTSHIFT | Key::KEY_RIGHTSHIFT => Some(Modifier::Shift),
            Key::KEY_LEFTALT | Key::KEY_RIGHTALT => Some(Modifier::Alt),
            Key::KEY_LEFTMETA | Key::KEY_RIGHTMETA => Some(Modifier::Super),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Modifier::Ctrl => "Ctrl",
            Modifier::Shift => "Shift",
            Modifier::Alt => "Alt",
            Modifier::Super => "Super",
        }
    }

    pub fn flag(self) -> ModifierSet {
        match self {
            Modifier::Ctrl => ModifierSet::CTRL,
            Modifier::Shift => ModifierSet::SHIFT,
            Modifier::Alt => ModifierSet::ALT,
            Modifier::Super => ModifierSet::SUPER,
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Modifiers currently held down
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ModifierSet: u8 {
        const CTRL = 1 << 0;
        const SHIFT = 1 << 1;
        const ALT = 1 << 2;
        const SUPER = 1 << 3;
    }
}

impl ModifierSet {
    /// Names of the held modifiers in display order (Ctrl, Alt, Shift, Super)
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Modifier::DISPLAY_ORDER
            .into_iter()
            .filter(move |m| self.contains(m.flag()))
            .map(Modifier::name)
    }
}

/// Check if a key is one of the eight modifier keys
pub fn is_modifier(key: Key) -> bool {
    Modifier::from_key(key).is_some()
}

/// Resolve a scancode to its display name.
///
/// Returns `None` for codes that should not be displayed.
pub fn key_name(key: Key) -> Option<&'static str> {
    let name = match key {
        // Letters
        Key::KEY_A => "A",
        Key::KEY_B => "B",
        Key::KEY_C => "C",
        Key::KEY_D => "D",
        Key::KEY_E => "E",
        Key::KEY_F => "F",
        Key::KEY_G => "G",
        Key::KEY_H => "H",
        Key::KEY_I => "I",
        Key::KEY_J => "J",
        Key::KEY_K => "K",
        Key::KEY_L => "L",
        Key::KEY_M => "M",
        Key::KEY_N => "N",
        Key::KEY_O => "O",
        Key::KEY_P => "P",
        Key::KEY_Q => "Q",
        Key::KEY_R => "R",
        Key::KEY_S => "S",
        Key::KEY_T => "T",
        Key::KEY_U => "U",
        Key::KEY_V => "V",
        Key::KEY_W => "W",
        Key::KEY_X => "X",
        Key::KEY_Y => "Y",
        Key::KEY_Z => "Z",

        // Number row
        Key::KEY_1 => "1",
        Key::KEY_2 => "2",
        Key::KEY_3 => "3",
        Key::KEY_4 => "4",
        Key::KEY_5 => "5",
        Key::KEY_6 => "6",
        Key::KEY_7 => "7",
        Key::KEY_8 => "8",
        Key::KEY_9 => "9",
        Key::KEY_0 => "0",

        // Whitespace and editing
        Key::KEY_SPACE => "Space",
        Key::KEY_ENTER => "Enter",
        Key::KEY_TAB => "Tab",
        Key::KEY_BACKSPACE => "Backspace",
        Key::KEY_ESC => "Esc",
        Key::KEY_INSERT => "Insert",
        Key::KEY_DELETE => "Delete",

        // Symbols
        Key::KEY_MINUS => "-",
        Key::KEY_EQUAL => "=",
        Key::KEY_LEFTBRACE => "[",
        Key::KEY_RIGHTBRACE => "]",
        Key::KEY_SEMICOLON => ";",
        Key::KEY_APOSTROPHE => "'",
        Key::KEY_GRAVE => "`",
        Key::KEY_BACKSLASH => "\\",
        Key::KEY_102ND => "\\",
        Key::KEY_COMMA => ",",
        Key::KEY_DOT => ".",
        Key::KEY_SLASH => "/",

        // Modifiers
        Key::KEY_LEFTCTRL | Key::KEY_RIGHTCTRL => "Ctrl",
        Key::KEY_LEFTSHIFT | Key::KEY_RIGHTSHIFT => "Shift",
        Key::KEY_LEFTALT | Key::KEY_RIGHTALT => "Alt",
        Key::KEY_LEFTMETA | Key::KEY_RIGHTMETA => "Super",

        // Locks and system keys
        Key::KEY_CAPSLOCK => "CapsLock",
        Key::KEY_NUMLOCK => "NumLock",
        Key::KEY_SCROLLLOCK => "ScrollLock",
        Key::KEY_SYSRQ => "PrintScreen",
        Key::KEY_PAUSE => "Pause",
        Key::KEY_COMPOSE => "Menu",

        // Navigation
        Key::KEY_UP => "Up",
        Key::KEY_DOWN => "Down",
        Key::KEY_LEFT => "Left",
        Key::KEY_RIGHT => "Right",
        Key::KEY_HOME => "Home",
        Key::KEY_END => "End",
        Key::KEY_PAGEUP => "PageUp",
        Key::KEY_PAGEDOWN => "PageDown",

        // Function keys
        Key::KEY_F1 => "F1",
        Key::KEY_F2 => "F2",
        Key::KEY_F3 => "F3",
        Key::KEY_F4 => "F4",
        Key::KEY_F5 => "F5",
        Key::KEY_F6 => "F6",
        Key::KEY_F7 => "F7",
        Key::KEY_F8 => "F8",
        Key::KEY_F9 => "F9",
        Key::KEY_F10 => "F10",
        Key::KEY_F11 => "F11",
        Key::KEY_F12 => "F12",

        // Keypad
        Key::KEY_KP0 => "KP0",
        Key::KEY_KP1 => "KP1",
        Key::KEY_KP2 => "KP2",
        Key::KEY_KP3 => "KP3",
        Key::KEY_KP4 => "KP4",
        Key::KEY_KP5 => "KP5",
        Key::KEY_KP6 => "KP6",
        Key::KEY_KP7 => "KP7",
        Key::KEY_KP8 => "KP8",
        Key::KEY_KP9 => "KP9",
        Key::KEY_KPDOT => "KPDot",
        Key::KEY_KPENTER => "KPEnter",
        Key::KEY_KPPLUS => "KPPlus",
        Key::KEY_KPMINUS => "KPMinus",
        Key::KEY_KPASTERISK => "KPMultiply",
        Key::KEY_KPSLASH => "KPDivide",

        // Media
        Key::KEY_MUTE => "Mute",
        Key::KEY_VOLUMEDOWN => "VolumeDown",
        Key::KEY_VOLUMEUP => "VolumeUp",
        Key::KEY_PLAYPAUSE => "PlayPause",
        Key::KEY_NEXTSONG => "Next",
        Key::KEY_PREVIOUSSONG => "Previous",

        _ => return None,
    };
    Some(name)
}
