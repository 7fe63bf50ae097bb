//! Events flowing through the pipeline

use std::time::SystemTime;

use evdev::Key;
use serde::Serialize;

use crate::keys::key_name;

/// State carried by a kernel key event value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// value = 0
    Released,
    /// value = 1
    Pressed,
    /// value = 2, hardware auto-repeat while the key stays down
    Repeating,
}

impl KeyState {
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(KeyState::Released),
            1 => Some(KeyState::Pressed),
            2 => Some(KeyState::Repeating),
            _ => None,
        }
    }
}

/// A decoded key event from one keyboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawKeyEvent {
    pub code: Key,
    pub name: &'static str,
    pub state: KeyState,
    pub timestamp: SystemTime,
}

impl RawKeyEvent {
    /// Build an event for a key with a display name.
    ///
    /// Returns `None` when the code has no entry in the key table.
    pub fn new(code: Key, state: KeyState, timestamp: SystemTime) -> Option<Self> {
        let name = key_name(code)?;
        Some(Self {
            code,
            name,
            state,
            timestamp,
        })
    }
}

/// Text ready for presentation.
///
/// Held events (`is_held`) are transient indications and never enter the
/// history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayEvent {
    pub text: String,
    pub timestamp: SystemTime,
    pub is_held: bool,
}

impl DisplayEvent {
    pub fn new(text: impl Into<String>, is_held: bool) -> Self {
        Self {
            text: text.into(),
            timestamp: SystemTime::now(),
            is_held,
        }
    }
}
