//! tapshow capture pipeline
//!
//! Finds keyboards, decodes their raw event records and turns them into
//! display events ("Ctrl+A", "Space (held)") for an on-screen display.
//!
//! ```text
//! device ──► reader (one task per keyboard) ──► processor ──► display sink
//! ```

pub mod device;
pub mod display;
pub mod error;
pub mod event;
pub mod keys;
pub mod normalize;
pub mod pipeline;
pub mod processor;
pub mod reader;
pub mod record;
pub mod shutdown;

#[cfg(test)]
mod testing;

pub use error::{InputError, NoKeyboardReason, RecordError};
pub use event::{DisplayEvent, KeyState, RawKeyEvent};
pub use normalize::normalize;
pub use pipeline::Pipeline;
pub use processor::{DisplayStream, ProcessorConfig};
