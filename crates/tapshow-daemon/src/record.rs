//! Decoding of raw `struct input_event` records
//!
//! On 64-bit Linux every record read from `/dev/input/event*` is 24 bytes:
//!
//! ```text
//! offset  size  field
//!      0     8  tv_sec   (i64, little-endian)
//!      8     8  tv_usec  (i64, little-endian)
//!     16     2  type     (u16, little-endian)
//!     18     2  code     (u16, little-endian)
//!     20     4  value    (i32, little-endian)
//! ```
//!
//! Fields are extracted at fixed offsets rather than by reinterpreting the
//! buffer, so host struct layout and padding never matter.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use evdev::Key;

use crate::error::RecordError;
use crate::event::{KeyState, RawKeyEvent};

/// Size of one input event record in bytes
pub const INPUT_EVENT_SIZE: usize = 24;

/// `EV_KEY` event type
pub const EV_KEY: u16 = 0x01;

/// One decoded input event record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputRecord {
    pub sec: i64,
    pub usec: i64,
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

impl InputRecord {
    /// Decode a record, rejecting buffers that are not exactly one record long
    pub fn parse(buf: &[u8]) -> Result<Self, RecordError> {
        let buf: &[u8; INPUT_EVENT_SIZE] = buf
            .try_into()
            .map_err(|_| RecordError::Length { got: buf.len() })?;

        Ok(Self {
            sec: i64::from_le_bytes(field(buf, 0)),
            usec: i64::from_le_bytes(field(buf, 8)),
            event_type: u16::from_le_bytes(field(buf, 16)),
            code: u16::from_le_bytes(field(buf, 18)),
            value: i32::from_le_bytes(field(buf, 20)),
        })
    }

    /// Encode into the kernel wire layout
    pub fn to_bytes(&self) -> [u8; INPUT_EVENT_SIZE] {
        let mut buf = [0u8; INPUT_EVENT_SIZE];
        buf[0..8].copy_from_slice(&self.sec.to_le_bytes());
        buf[8..16].copy_from_slice(&self.usec.to_le_bytes());
        buf[16..18].copy_from_slice(&self.event_type.to_le_bytes());
        buf[18..20].copy_from_slice(&self.code.to_le_bytes());
        buf[20..24].copy_from_slice(&self.value.to_le_bytes());
        buf
    }

    /// Kernel timestamp of the record, or the current time if it is out of range
    pub fn timestamp(&self) -> SystemTime {
        let secs = u64::try_from(self.sec).ok();
        let micros = u64::try_from(self.usec).ok().filter(|us| *us < 1_000_000);

        secs.zip(micros)
            .and_then(|(secs, micros)| {
                UNIX_EPOCH.checked_add(Duration::from_secs(secs) + Duration::from_micros(micros))
            })
            .unwrap_or_else(SystemTime::now)
    }

    /// Convert into a key event.
    ///
    /// Returns `None` for non-key records, unknown values and codes without
    /// a display name.
    pub fn key_event(&self) -> Option<RawKeyEvent> {
        if self.event_type != EV_KEY {
            return None;
        }
        let state = KeyState::from_value(self.value)?;
        RawKeyEvent::new(Key::new(self.code), state, self.timestamp())
    }
}

fn field<const N: usize>(buf: &[u8; INPUT_EVENT_SIZE], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    out
}
