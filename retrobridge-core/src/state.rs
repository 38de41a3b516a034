//! Save-state exchange.
//!
//! The blob is opaque: the host never looks inside it. What the host does check comes from
//! the serialization quirks the core declared (SET_SERIALIZATION_QUIRKS) and from the
//! provenance recorded next to a state taken in this process.

use std::fs;
use std::io;
use std::path::Path;

use lazy_static::lazy_static;
use tracing::debug;

use crate::abi::quirks;
use crate::error::StateError;
use crate::loader::CoreApi;

lazy_static! {
    static ref PLATFORM: String = format!(
        "{}-{}-{}",
        std::env::consts::ARCH,
        std::env::consts::OS,
        if cfg!(target_endian = "big") { "be" } else { "le" }
    );
}

/// `<arch>-<os>-<endianness>` of this host.
pub fn host_platform() -> &'static str {
    PLATFORM.as_str()
}

fn endianness(platform: &str) -> &str {
    platform.rsplit('-').next().unwrap_or(platform)
}

/// A serialized core state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveState {
    pub data: Vec<u8>,
    /// Session that produced the state; `None` when read from disk.
    pub session: Option<u64>,
    /// [`host_platform`] of the producer; `None` when unknown.
    pub platform: Option<String>,
}

impl SaveState {
    /// A state of unknown provenance.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            session: None,
            platform: None,
        }
    }

    /// Read a raw state file.
    pub fn read(path: &Path) -> io::Result<Self> {
        fs::read(path).map(Self::from_bytes)
    }

    /// Write the raw blob. Provenance is not persisted.
    pub fn write(&self, path: &Path) -> io::Result<()> {
        fs::write(path, &self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// What the checks need to know about the calling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateContext {
    pub quirks: u64,
    /// Frames run since the game was loaded.
    pub frames: u64,
    pub session: u64,
}

impl StateContext {
    fn has(&self, quirk: u64) -> bool {
        self.quirks & quirk != 0
    }

    pub(crate) fn check_initialized(&self) -> Result<(), StateError> {
        if self.has(quirks::MUST_INITIALIZE) && self.frames == 0 {
            return Err(StateError::NotInitialized);
        }
        Ok(())
    }
}

/// `retro_serialize_size`.
///
/// # Safety
/// The core's callbacks must be routed to its session (see `host::callbacks::activate`).
pub unsafe fn size(api: &CoreApi) -> usize {
    unsafe { (api.serialize_size)() }
}

/// Take a snapshot of the core.
///
/// # Safety
/// Same as [`size`].
pub unsafe fn save(api: &CoreApi, ctx: StateContext) -> Result<SaveState, StateError> {
    ctx.check_initialized()?;
    let size = unsafe { size(api) };
    if size == 0 {
        return Err(StateError::Unsupported);
    }
    let mut data = vec![0u8; size];
    if !unsafe { (api.serialize)(data.as_mut_ptr().cast(), size) } {
        return Err(StateError::SerializeFailed { size });
    }
    debug!(size, "state serialized");
    Ok(SaveState {
        data,
        session: Some(ctx.session),
        platform: Some(host_platform().to_string()),
    })
}

/// Check `state` against the declared quirks, then hand it to the core.
///
/// # Safety
/// Same as [`size`].
pub unsafe fn restore(
    api: &CoreApi,
    ctx: StateContext,
    state: &SaveState,
) -> Result<(), StateError> {
    ctx.check_initialized()?;
    if ctx.has(quirks::SINGLE_SESSION) && state.session.is_some_and(|s| s != ctx.session) {
        return Err(StateError::ForeignSession);
    }
    if let Some(found) = state.platform.as_deref() {
        let host = host_platform();
        let mismatch = (ctx.has(quirks::PLATFORM_DEPENDENT) && found != host)
            || (ctx.has(quirks::ENDIAN_DEPENDENT) && endianness(found) != endianness(host));
        if mismatch {
            return Err(StateError::PlatformMismatch {
                expected: host,
                found: found.to_string(),
            });
        }
    }

    let expected = unsafe { size(api) };
    if expected == 0 {
        return Err(StateError::Unsupported);
    }
    if !ctx.has(quirks::CORE_VARIABLE_SIZE) && state.len() != expected {
        return Err(StateError::SizeMismatch {
            expected,
            actual: state.len(),
        });
    }
    if !unsafe { (api.unserialize)(state.data.as_ptr().cast(), state.len()) } {
        return Err(StateError::UnserializeFailed { size: state.len() });
    }
    debug!(size = state.len(), "state restored");
    Ok(())
}
