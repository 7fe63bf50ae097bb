//! Error types for keyboard discovery and record decoding

use std::fmt;

use thiserror::Error;

/// Errors that stop the input side of the pipeline from starting
#[derive(Debug, Error)]
pub enum InputError {
    /// Listing input device nodes failed
    #[error("Failed to enumerate input devices: {0}")]
    Enumeration(#[source] std::io::Error),

    /// Enumeration worked but no keyboard could be opened
    #[error("No usable keyboard device: {0}")]
    NoUsableKeyboard(NoKeyboardReason),
}

/// Why no keyboard could be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoKeyboardReason {
    /// No device looked like a keyboard
    NoneFound,
    /// Keyboards (or unprobed devices) exist but could not be opened
    Inaccessible { count: usize },
}

impl fmt::Display for NoKeyboardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoKeyboardReason::NoneFound => write!(f, "no keyboards found"),
            NoKeyboardReason::Inaccessible { count } => write!(
                f,
                "{} input device(s) could not be opened - \
                 ensure you're in the 'input' group",
                count
            ),
        }
    }
}

/// A read that did not produce a well-formed record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("Expected a 24 byte input event, got {got} bytes")]
    Length { got: usize },
}
