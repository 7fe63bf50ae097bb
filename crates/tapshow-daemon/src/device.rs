//! Keyboard discovery
//!
//! Device nodes come from a [`DeviceSource`], which answers the capability
//! queries used to decide what counts as a keyboard. [`EvdevSource`] is the
//! real `/dev/input` implementation; tests provide their own.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use evdev::{Device, EventType, Key};
use nix::fcntl::OFlag;
use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::{InputError, NoKeyboardReason};

/// Substrings of device names that mark pointing devices
const POINTER_NAME_PARTS: [&str; 4] = ["mouse", "touchpad", "trackpad", "trackpoint"];

/// Capabilities reported by an input device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Declared device name
    pub name: String,
    /// Whether the device supports `EV_KEY` events
    pub has_key_events: bool,
    /// Supported key codes
    pub supported_keys: Vec<u16>,
}

/// Outcome of classifying a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Keyboard,
    /// Name says mouse, touchpad, trackpad or trackpoint
    PointingDevice,
    /// Does not report key events at all
    NoKeyEvents,
    /// Reports keys but none of Q..P, e.g. power or volume buttons
    NoLetterKeys,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::Keyboard => write!(f, "keyboard"),
            DeviceClass::PointingDevice => write!(f, "pointing device"),
            DeviceClass::NoKeyEvents => write!(f, "no key events"),
            DeviceClass::NoLetterKeys => write!(f, "no letter keys"),
        }
    }
}

impl DeviceCapabilities {
    pub fn classify(&self) -> DeviceClass {
        let name = self.name.to_lowercase();
        if POINTER_NAME_PARTS.iter().any(|part| name.contains(part)) {
            return DeviceClass::PointingDevice;
        }

        if !self.has_key_events {
            return DeviceClass::NoKeyEvents;
        }

        // The top letter row is contiguous: KEY_Q (16) through KEY_P (25)
        let letters = Key::KEY_Q.code()..=Key::KEY_P.code();
        if !self.supported_keys.iter().any(|code| letters.contains(code)) {
            return DeviceClass::NoLetterKeys;
        }

        DeviceClass::Keyboard
    }

    pub fn is_keyboard(&self) -> bool {
        self.classify() == DeviceClass::Keyboard
    }
}

/// Where input devices come from.
///
/// `probe` and `open` are separate because probing needs only a short-lived
/// handle, while the opened handle is read for the lifetime of the pipeline.
pub trait DeviceSource {
    type Handle: AsyncRead + Unpin + Send + 'static;

    /// List candidate device nodes
    fn device_paths(&self) -> io::Result<Vec<PathBuf>>;

    /// Query the declared name and key capabilities of a device
    fn probe(&self, path: &Path) -> io::Result<DeviceCapabilities>;

    /// Open a device for reading event records
    fn open(&self, path: &Path) -> io::Result<Self::Handle>;
}

/// Keyboards found by [`locate_keyboards`]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LocatedKeyboards {
    pub paths: Vec<PathBuf>,
    /// Devices that could not be probed for lack of permission
    pub inaccessible: usize,
}

/// Find every device the source reports as a keyboard.
///
/// Fails only if the device list itself cannot be produced. Devices that
/// cannot be probed are skipped; permission failures are counted so the
/// caller can tell "no keyboard" apart from "no access".
pub fn locate_keyboards<S: DeviceSource + ?Sized>(
    source: &S,
) -> Result<LocatedKeyboards, InputError> {
    let candidates = source.device_paths().map_err(InputError::Enumeration)?;
    let mut located = LocatedKeyboards::default();

    for path in candidates {
        match source.probe(&path) {
            Ok(caps) => match caps.classify() {
                DeviceClass::Keyboard => {
                    tracing::debug!("Found keyboard '{}' at {}", caps.name, path.display());
                    located.paths.push(path);
                }
                class => {
                    tracing::debug!(
                        "Skipping '{}' at {}: {}",
                        caps.name,
                        path.display(),
                        class
                    );
                }
            },
            Err(e) => {
                if e.kind() == io::ErrorKind::PermissionDenied {
                    located.inaccessible += 1;
                }
                tracing::debug!("Could not probe {}: {}", path.display(), e);
            }
        }
    }

    Ok(located)
}

/// Pick the error reported when no keyboard could be opened
pub(crate) fn no_keyboard_reason(located: &LocatedKeyboards, open_failures: usize) -> NoKeyboardReason {
    let count = located.inaccessible + open_failures;
    if count == 0 {
        NoKeyboardReason::NoneFound
    } else {
        NoKeyboardReason::Inaccessible { count }
    }
}

/// Default directory holding evdev nodes
pub const INPUT_DIR: &str = "/dev/input";

/// Devices under `/dev/input`, probed with evdev
#[derive(Debug, Clone)]
pub struct EvdevSource {
    dir: PathBuf,
}

impl EvdevSource {
    pub fn new() -> Self {
        Self::with_dir(INPUT_DIR)
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Default for EvdevSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceSource for EvdevSource {
    type Handle = DeviceFile;

    fn device_paths(&self) -> io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();

        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();

            // Only look at event* devices
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("event"))
                .unwrap_or(false)
            {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }

    fn probe(&self, path: &Path) -> io::Result<DeviceCapabilities> {
        let device = Device::open(path)?;

        Ok(DeviceCapabilities {
            name: device.name().unwrap_or("Unknown").to_string(),
            has_key_events: device.supported_events().contains(EventType::KEY),
            supported_keys: device
                .supported_keys()
                .map(|keys| keys.iter().map(|key| key.code()).collect())
                .unwrap_or_default(),
        })
    }

    fn open(&self, path: &Path) -> io::Result<DeviceFile> {
        DeviceFile::open(path)
    }
}

/// A non-blocking evdev node driven by the tokio reactor.
///
/// Dropping the handle closes the file descriptor.
#[derive(Debug)]
pub struct DeviceFile {
    inner: AsyncFd<File>,
}

impl DeviceFile {
    /// Open a device node. Must be called from within a tokio runtime.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(OFlag::O_NONBLOCK.bits())
            .open(path)?;

        Ok(Self {
            inner: AsyncFd::new(file)?,
        })
    }
}

impl AsyncRead for DeviceFile {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            let mut guard = ready!(self.inner.poll_read_ready(cx))?;

            let unfilled = buf.initialize_unfilled();
            match guard.try_io(|inner| inner.get_ref().read(unfilled)) {
                Ok(Ok(len)) => {
                    buf.advance(len);
                    return Poll::Ready(Ok(()));
                }
                Ok(Err(err)) => return Poll::Ready(Err(err)),
                Err(_would_block) => continue,
            }
        }
    }
}
