//! Function-pointer signatures exchanged with the core.
//!
//! All signatures use the C calling convention. Pointers that the core may leave null are
//! wrapped in `Option<...>` at the struct field that carries them (same layout, null niche).

use core::ffi::{c_char, c_int, c_uint, c_void};

use super::types::{
    GameInfo, PerfCounter, SystemAvInfo, SystemInfo, VfsDirHandle, VfsFileHandle,
};

// ---------------------------------------------------------------------------
// Host callbacks registered with the core
// ---------------------------------------------------------------------------

pub type EnvironmentFn = unsafe extern "C" fn(cmd: c_uint, data: *mut c_void) -> bool;
pub type VideoRefreshFn =
    unsafe extern "C" fn(data: *const c_void, width: c_uint, height: c_uint, pitch: usize);
pub type AudioSampleFn = unsafe extern "C" fn(left: i16, right: i16);
pub type AudioSampleBatchFn = unsafe extern "C" fn(data: *const i16, frames: usize) -> usize;
pub type InputPollFn = unsafe extern "C" fn();
pub type InputStateFn =
    unsafe extern "C" fn(port: c_uint, device: c_uint, index: c_uint, id: c_uint) -> i16;

// ---------------------------------------------------------------------------
// Core lifecycle entry points
// ---------------------------------------------------------------------------

pub type SetEnvironmentFn = unsafe extern "C" fn(cb: EnvironmentFn);
pub type SetVideoRefreshFn = unsafe extern "C" fn(cb: VideoRefreshFn);
pub type SetAudioSampleFn = unsafe extern "C" fn(cb: AudioSampleFn);
pub type SetAudioSampleBatchFn = unsafe extern "C" fn(cb: AudioSampleBatchFn);
pub type SetInputPollFn = unsafe extern "C" fn(cb: InputPollFn);
pub type SetInputStateFn = unsafe extern "C" fn(cb: InputStateFn);

pub type InitFn = unsafe extern "C" fn();
pub type DeinitFn = unsafe extern "C" fn();
pub type ApiVersionFn = unsafe extern "C" fn() -> c_uint;
pub type GetSystemInfoFn = unsafe extern "C" fn(info: *mut SystemInfo);
pub type GetSystemAvInfoFn = unsafe extern "C" fn(info: *mut SystemAvInfo);
pub type SetControllerPortDeviceFn = unsafe extern "C" fn(port: c_uint, device: c_uint);
pub type ResetFn = unsafe extern "C" fn();
pub type RunFn = unsafe extern "C" fn();
pub type SerializeSizeFn = unsafe extern "C" fn() -> usize;
pub type SerializeFn = unsafe extern "C" fn(data: *mut c_void, size: usize) -> bool;
pub type UnserializeFn = unsafe extern "C" fn(data: *const c_void, size: usize) -> bool;
pub type CheatResetFn = unsafe extern "C" fn();
pub type CheatSetFn = unsafe extern "C" fn(index: c_uint, enabled: bool, code: *const c_char);
pub type LoadGameFn = unsafe extern "C" fn(game: *const GameInfo) -> bool;
pub type LoadGameSpecialFn =
    unsafe extern "C" fn(game_type: c_uint, info: *const GameInfo, num_info: usize) -> bool;
pub type UnloadGameFn = unsafe extern "C" fn();
pub type GetRegionFn = unsafe extern "C" fn() -> c_uint;
pub type GetMemoryDataFn = unsafe extern "C" fn(id: c_uint) -> *mut c_void;
pub type GetMemorySizeFn = unsafe extern "C" fn(id: c_uint) -> usize;

// ---------------------------------------------------------------------------
// Interfaces served by the host
// ---------------------------------------------------------------------------

/// `retro_log_printf_t`. The host side is implemented non-variadically and only prints the
/// format string (see `environment::interfaces`).
pub type LogPrintfFn = unsafe extern "C" fn(level: c_int, fmt: *const c_char, ...);

pub type PerfGetTimeUsecFn = unsafe extern "C" fn() -> i64;
pub type PerfGetCounterFn = unsafe extern "C" fn() -> u64;
pub type GetCpuFeaturesFn = unsafe extern "C" fn() -> u64;
pub type PerfLogFn = unsafe extern "C" fn();
pub type PerfRegisterFn = unsafe extern "C" fn(counter: *mut PerfCounter);
pub type PerfStartFn = unsafe extern "C" fn(counter: *mut PerfCounter);
pub type PerfStopFn = unsafe extern "C" fn(counter: *mut PerfCounter);

pub type SetRumbleStateFn =
    unsafe extern "C" fn(port: c_uint, effect: c_int, strength: u16) -> bool;
pub type SetLedStateFn = unsafe extern "C" fn(led: c_int, state: c_int);

pub type MidiInputEnabledFn = unsafe extern "C" fn() -> bool;
pub type MidiOutputEnabledFn = unsafe extern "C" fn() -> bool;
pub type MidiReadFn = unsafe extern "C" fn(byte: *mut u8) -> bool;
pub type MidiWriteFn = unsafe extern "C" fn(byte: u8, delta_time: u32) -> bool;
pub type MidiFlushFn = unsafe extern "C" fn() -> bool;

pub type SetSensorStateFn = unsafe extern "C" fn(port: c_uint, action: c_int, rate: c_uint) -> bool;
pub type SensorGetInputFn = unsafe extern "C" fn(port: c_uint, id: c_uint) -> f32;

pub type CameraStartFn = unsafe extern "C" fn() -> bool;
pub type CameraStopFn = unsafe extern "C" fn();
pub type CameraLifetimeStatusFn = unsafe extern "C" fn();
pub type CameraFrameRawFramebufferFn =
    unsafe extern "C" fn(buffer: *const u32, width: c_uint, height: c_uint, pitch: usize);
pub type CameraFrameOpenglTextureFn =
    unsafe extern "C" fn(texture_id: c_uint, texture_target: c_uint, affine: *const f32);

pub type LocationSetIntervalFn =
    unsafe extern "C" fn(interval_ms: c_uint, interval_distance: c_uint);
pub type LocationStartFn = unsafe extern "C" fn() -> bool;
pub type LocationStopFn = unsafe extern "C" fn();
pub type LocationGetPositionFn = unsafe extern "C" fn(
    lat: *mut f64,
    lon: *mut f64,
    horiz_accuracy: *mut f64,
    vert_accuracy: *mut f64,
) -> bool;
pub type LocationLifetimeStatusFn = unsafe extern "C" fn();

// VFS v1..v3
pub type VfsGetPathFn = unsafe extern "C" fn(stream: *mut VfsFileHandle) -> *const c_char;
pub type VfsOpenFn =
    unsafe extern "C" fn(path: *const c_char, mode: c_uint, hints: c_uint) -> *mut VfsFileHandle;
pub type VfsCloseFn = unsafe extern "C" fn(stream: *mut VfsFileHandle) -> c_int;
pub type VfsSizeFn = unsafe extern "C" fn(stream: *mut VfsFileHandle) -> i64;
pub type VfsTruncateFn = unsafe extern "C" fn(stream: *mut VfsFileHandle, length: i64) -> i64;
pub type VfsTellFn = unsafe extern "C" fn(stream: *mut VfsFileHandle) -> i64;
pub type VfsSeekFn =
    unsafe extern "C" fn(stream: *mut VfsFileHandle, offset: i64, seek_position: c_int) -> i64;
pub type VfsReadFn =
    unsafe extern "C" fn(stream: *mut VfsFileHandle, s: *mut c_void, len: u64) -> i64;
pub type VfsWriteFn =
    unsafe extern "C" fn(stream: *mut VfsFileHandle, s: *const c_void, len: u64) -> i64;
pub type VfsFlushFn = unsafe extern "C" fn(stream: *mut VfsFileHandle) -> c_int;
pub type VfsRemoveFn = unsafe extern "C" fn(path: *const c_char) -> c_int;
pub type VfsRenameFn =
    unsafe extern "C" fn(old_path: *const c_char, new_path: *const c_char) -> c_int;
pub type VfsStatFn = unsafe extern "C" fn(path: *const c_char, size: *mut i32) -> c_int;
pub type VfsMkdirFn = unsafe extern "C" fn(dir: *const c_char) -> c_int;
pub type VfsOpendirFn =
    unsafe extern "C" fn(dir: *const c_char, include_hidden: bool) -> *mut VfsDirHandle;
pub type VfsReaddirFn = unsafe extern "C" fn(dirstream: *mut VfsDirHandle) -> bool;
pub type VfsDirentGetNameFn = unsafe extern "C" fn(dirstream: *mut VfsDirHandle) -> *const c_char;
pub type VfsDirentIsDirFn = unsafe extern "C" fn(dirstream: *mut VfsDirHandle) -> bool;
pub type VfsClosedirFn = unsafe extern "C" fn(dirstream: *mut VfsDirHandle) -> c_int;

// ---------------------------------------------------------------------------
// Callbacks registered by the core
// ---------------------------------------------------------------------------

/// Generic function pointer returned by proc-address lookups.
pub type ProcAddress = Option<unsafe extern "C" fn()>;
pub type GetProcAddressFn = unsafe extern "C" fn(sym: *const c_char) -> ProcAddress;

pub type HwContextResetFn = unsafe extern "C" fn();
pub type HwGetCurrentFramebufferFn = unsafe extern "C" fn() -> usize;
pub type HwGetProcAddressFn = unsafe extern "C" fn(sym: *const c_char) -> ProcAddress;

pub type KeyboardEventFn =
    unsafe extern "C" fn(down: bool, keycode: c_uint, character: u32, key_modifiers: u16);

pub type AudioCallbackFn = unsafe extern "C" fn();
pub type AudioSetStateFn = unsafe extern "C" fn(enabled: bool);
pub type FrameTimeCallbackFn = unsafe extern "C" fn(usec: i64);
pub type AudioBufferStatusFn =
    unsafe extern "C" fn(active: bool, occupancy: c_uint, underrun_likely: bool);

pub type SetEjectStateFn = unsafe extern "C" fn(ejected: bool) -> bool;
pub type GetEjectStateFn = unsafe extern "C" fn() -> bool;
pub type GetImageIndexFn = unsafe extern "C" fn() -> c_uint;
pub type SetImageIndexFn = unsafe extern "C" fn(index: c_uint) -> bool;
pub type GetNumImagesFn = unsafe extern "C" fn() -> c_uint;
pub type ReplaceImageIndexFn = unsafe extern "C" fn(index: c_uint, info: *const GameInfo) -> bool;
pub type AddImageIndexFn = unsafe extern "C" fn() -> bool;
pub type SetInitialImageFn = unsafe extern "C" fn(index: c_uint, path: *const c_char) -> bool;
pub type GetImagePathFn =
    unsafe extern "C" fn(index: c_uint, path: *mut c_char, len: usize) -> bool;
pub type GetImageLabelFn =
    unsafe extern "C" fn(index: c_uint, label: *mut c_char, len: usize) -> bool;

/// `retro_clear_all_thread_waits_cb_t` (RetroArch extension).
pub type ClearAllThreadWaitsFn =
    unsafe extern "C" fn(clear_threads: c_uint, data: *mut c_void) -> bool;
