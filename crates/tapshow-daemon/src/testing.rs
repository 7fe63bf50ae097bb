//! In-memory device source for tests

use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};
use std::time::SystemTime;

use evdev::Key;
use nix::sys::stat::Mode;
use tokio::io::{AsyncRead, DuplexStream, ReadBuf};

use crate::device::{DeviceCapabilities, DeviceSource};
use crate::event::{KeyState, RawKeyEvent};
use crate::record::{InputRecord, EV_KEY};

pub(crate) type MockHandle = Box<dyn AsyncRead + Unpin + Send>;

/// Capabilities of an ordinary full-size keyboard
pub(crate) fn keyboard_caps(name: &str) -> DeviceCapabilities {
    DeviceCapabilities {
        name: name.to_string(),
        has_key_events: true,
        supported_keys: (1..=127).collect(),
    }
}

/// Bytes of one key record as the kernel would deliver them
pub(crate) fn key_bytes(code: Key, value: i32) -> [u8; 24] {
    InputRecord {
        sec: 1_700_000_000,
        usec: 0,
        event_type: EV_KEY,
        code: code.code(),
        value,
    }
    .to_bytes()
}

pub(crate) fn raw(code: Key, state: KeyState) -> RawKeyEvent {
    RawKeyEvent::new(code, state, SystemTime::now()).unwrap()
}

/// A raw event carrying an arbitrary display name
pub(crate) fn named(code: Key, name: &'static str, state: KeyState) -> RawKeyEvent {
    RawKeyEvent {
        code,
        name,
        state,
        timestamp: SystemTime::now(),
    }
}

/// Create a named pipe in `dir` to stand in for a device node
pub(crate) fn fifo(dir: &Path) -> PathBuf {
    let path = dir.join("event0");
    nix::unistd::mkfifo(&path, Mode::S_IRUSR | Mode::S_IWUSR).unwrap();
    path
}

/// Reader that fails on the first read, like an unplugged device
pub(crate) struct FailingReader;

impl AsyncRead for FailingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "No such device")))
    }
}

/// Reader that returns each chunk from one read call, then stays pending.
///
/// Lets tests control exactly how many bytes every read produces.
pub(crate) struct ChunkedReader {
    chunks: VecDeque<Vec<u8>>,
}

impl ChunkedReader {
    pub(crate) fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Self {
            chunks: chunks.into_iter().map(|c| c.as_ref().to_vec()).collect(),
        }
    }
}

impl AsyncRead for ChunkedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.chunks.pop_front() {
            Some(chunk) => {
                let len = chunk.len().min(buf.remaining());
                buf.put_slice(&chunk[..len]);
                Poll::Ready(Ok(()))
            }
            None => Poll::Pending,
        }
    }
}

enum Probe {
    Caps(DeviceCapabilities),
    Error(io::ErrorKind),
}

pub(crate) struct MockSource {
    paths: Vec<PathBuf>,
    probes: HashMap<PathBuf, Probe>,
    handles: Mutex<HashMap<PathBuf, MockHandle>>,
    enumeration_error: Option<io::ErrorKind>,
}

impl MockSource {
    pub(crate) fn new() -> Self {
        Self {
            paths: Vec::new(),
            probes: HashMap::new(),
            handles: Mutex::new(HashMap::new()),
            enumeration_error: None,
        }
    }

    /// A device that probes fine but cannot be opened
    pub(crate) fn with_device(mut self, path: &str, caps: DeviceCapabilities) -> Self {
        self.paths.push(PathBuf::from(path));
        self.probes.insert(PathBuf::from(path), Probe::Caps(caps));
        self
    }

    /// A keyboard whose reads come from `handle`
    pub(crate) fn with_keyboard(self, path: &str, handle: impl AsyncRead + Unpin + Send + 'static) -> Self {
        let this = self.with_device(path, keyboard_caps(path));
        this.handles
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), Box::new(handle));
        this
    }

    /// A keyboard fed through an in-memory pipe; returns the writing end
    pub(crate) fn with_duplex_keyboard(self, path: &str) -> (Self, DuplexStream) {
        let (reader, writer) = tokio::io::duplex(24 * 64);
        (self.with_keyboard(path, reader), writer)
    }

    pub(crate) fn with_unprobeable(mut self, path: &str, kind: io::ErrorKind) -> Self {
        self.paths.push(PathBuf::from(path));
        self.probes.insert(PathBuf::from(path), Probe::Error(kind));
        self
    }

    pub(crate) fn with_enumeration_error(mut self, kind: io::ErrorKind) -> Self {
        self.enumeration_error = Some(kind);
        self
    }
}

impl DeviceSource for MockSource {
    type Handle = MockHandle;

    fn device_paths(&self) -> io::Result<Vec<PathBuf>> {
        match self.enumeration_error {
            Some(kind) => Err(io::Error::new(kind, "cannot list devices")),
            None => Ok(self.paths.clone()),
        }
    }

    fn probe(&self, path: &Path) -> io::Result<DeviceCapabilities> {
        match self.probes.get(path) {
            Some(Probe::Caps(caps)) => Ok(caps.clone()),
            Some(Probe::Error(kind)) => Err(io::Error::new(*kind, "probe failed")),
            None => Err(io::ErrorKind::NotFound.into()),
        }
    }

    fn open(&self, path: &Path) -> io::Result<MockHandle> {
        self.handles
            .lock()
            .unwrap()
            .remove(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied"))
    }
}
