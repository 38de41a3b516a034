//! `#[repr(C)]` structs exchanged with the core.
//!
//! Field order, widths and padding follow `libretro.h` exactly. Enumerations written by the
//! core are kept as raw integers (`i32` / `u32`); use the `TryFrom` impls in [`super`] to
//! interpret them.

use core::ffi::{c_char, c_uint, c_void};
use core::ptr;

use super::callbacks::*;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SystemInfo {
    pub library_name: *const c_char,
    pub library_version: *const c_char,
    pub valid_extensions: *const c_char,
    pub need_fullpath: bool,
    pub block_extract: bool,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            library_name: ptr::null(),
            library_version: ptr::null(),
            valid_extensions: ptr::null(),
            need_fullpath: false,
            block_extract: false,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GameGeometry {
    pub base_width: c_uint,
    pub base_height: c_uint,
    pub max_width: c_uint,
    pub max_height: c_uint,
    /// `<= 0.0` means "use base_width / base_height".
    pub aspect_ratio: f32,
}

impl GameGeometry {
    /// Effective display aspect ratio.
    pub fn effective_aspect(&self) -> f32 {
        if self.aspect_ratio > 0.0 {
            self.aspect_ratio
        } else if self.base_height == 0 {
            1.0
        } else {
            self.base_width as f32 / self.base_height as f32
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemTiming {
    pub fps: f64,
    pub sample_rate: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemAvInfo {
    pub geometry: GameGeometry,
    pub timing: SystemTiming,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GameInfo {
    pub path: *const c_char,
    pub data: *const c_void,
    pub size: usize,
    pub meta: *const c_char,
}

impl Default for GameInfo {
    fn default() -> Self {
        Self {
            path: ptr::null(),
            data: ptr::null(),
            size: 0,
            meta: ptr::null(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GameInfoExt {
    pub full_path: *const c_char,
    pub archive_path: *const c_char,
    pub archive_file: *const c_char,
    pub dir: *const c_char,
    pub name: *const c_char,
    pub ext: *const c_char,
    pub meta: *const c_char,
    pub data: *const c_void,
    pub size: usize,
    pub file_in_archive: bool,
    pub persistent_data: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SystemContentInfoOverride {
    pub extensions: *const c_char,
    pub need_fullpath: bool,
    pub persistent_data: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Variable {
    pub key: *const c_char,
    pub value: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Message {
    pub msg: *const c_char,
    pub frames: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MessageExt {
    pub msg: *const c_char,
    pub duration: c_uint,
    pub priority: c_uint,
    /// `retro_log_level`
    pub level: i32,
    /// `retro_message_target`
    pub target: i32,
    /// `retro_message_type`
    pub type_: i32,
    pub progress: i8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InputDescriptor {
    pub port: c_uint,
    pub device: c_uint,
    pub index: c_uint,
    pub id: c_uint,
    pub description: *const c_char,
}

/// GET_CURRENT_SOFTWARE_FRAMEBUFFER payload.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Framebuffer {
    pub data: *mut c_void,
    pub width: c_uint,
    pub height: c_uint,
    pub pitch: usize,
    /// `retro_pixel_format`
    pub format: i32,
    pub access_flags: c_uint,
    pub memory_flags: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MemoryDescriptor {
    pub flags: u64,
    pub ptr: *mut c_void,
    pub offset: usize,
    pub start: usize,
    pub select: usize,
    pub disconnect: usize,
    pub len: usize,
    pub addrspace: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MemoryMap {
    pub descriptors: *const MemoryDescriptor,
    pub num_descriptors: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ControllerDescription {
    pub desc: *const c_char,
    pub id: c_uint,
}

/// SET_CONTROLLER_INFO passes an array of these terminated by `types == NULL`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ControllerInfo {
    pub types: *const ControllerDescription,
    pub num_types: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SubsystemMemoryInfo {
    pub extension: *const c_char,
    pub type_: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SubsystemRomInfo {
    pub desc: *const c_char,
    pub valid_extensions: *const c_char,
    pub need_fullpath: bool,
    pub block_extract: bool,
    pub required: bool,
    pub memory: *const SubsystemMemoryInfo,
    pub num_memory: c_uint,
}

/// SET_SUBSYSTEM_INFO passes an array of these terminated by `ident == NULL`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SubsystemInfo {
    pub desc: *const c_char,
    pub ident: *const c_char,
    pub roms: *const SubsystemRomInfo,
    pub num_roms: c_uint,
    pub id: c_uint,
}

// ---------------------------------------------------------------------------
// Interfaces
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GetProcAddressInterface {
    pub get_proc_address: Option<GetProcAddressFn>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LogCallback {
    pub log: Option<LogPrintfFn>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PerfCounter {
    pub ident: *const c_char,
    pub start: u64,
    pub total: u64,
    pub call_cnt: u64,
    pub registered: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PerfCallback {
    pub get_time_usec: Option<PerfGetTimeUsecFn>,
    pub get_cpu_features: Option<GetCpuFeaturesFn>,
    pub get_perf_counter: Option<PerfGetCounterFn>,
    pub perf_register: Option<PerfRegisterFn>,
    pub perf_start: Option<PerfStartFn>,
    pub perf_stop: Option<PerfStopFn>,
    pub perf_log: Option<PerfLogFn>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RumbleInterface {
    pub set_rumble_state: Option<SetRumbleStateFn>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LedInterface {
    pub set_led_state: Option<SetLedStateFn>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MidiInterface {
    pub input_enabled: Option<MidiInputEnabledFn>,
    pub output_enabled: Option<MidiOutputEnabledFn>,
    pub read: Option<MidiReadFn>,
    pub write: Option<MidiWriteFn>,
    pub flush: Option<MidiFlushFn>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SensorInterface {
    pub set_sensor_state: Option<SetSensorStateFn>,
    pub get_sensor_input: Option<SensorGetInputFn>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CameraCallback {
    pub caps: u64,
    pub width: c_uint,
    pub height: c_uint,
    pub start: Option<CameraStartFn>,
    pub stop: Option<CameraStopFn>,
    pub frame_raw_framebuffer: Option<CameraFrameRawFramebufferFn>,
    pub frame_opengl_texture: Option<CameraFrameOpenglTextureFn>,
    pub initialized: Option<CameraLifetimeStatusFn>,
    pub deinitialized: Option<CameraLifetimeStatusFn>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LocationCallback {
    pub start: Option<LocationStartFn>,
    pub stop: Option<LocationStopFn>,
    pub get_position: Option<LocationGetPositionFn>,
    pub set_interval: Option<LocationSetIntervalFn>,
    pub initialized: Option<LocationLifetimeStatusFn>,
    pub deinitialized: Option<LocationLifetimeStatusFn>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AudioCallback {
    pub callback: Option<AudioCallbackFn>,
    pub set_state: Option<AudioSetStateFn>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FrameTimeCallback {
    pub callback: Option<FrameTimeCallbackFn>,
    /// Ideal frame duration in microseconds, used when the host fast-forwards or pauses.
    pub reference: i64,
}

/// SET_FASTFORWARDING_OVERRIDE payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FastforwardingOverride {
    /// Maximum speed multiplier; `<= 0.0` means unlimited.
    pub ratio: f32,
    pub fastforward: bool,
    pub notification: bool,
    pub inhibit_toggle: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AudioBufferStatusCallback {
    pub callback: Option<AudioBufferStatusFn>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct KeyboardCallback {
    pub callback: Option<KeyboardEventFn>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DiskControlCallback {
    pub set_eject_state: Option<SetEjectStateFn>,
    pub get_eject_state: Option<GetEjectStateFn>,
    pub get_image_index: Option<GetImageIndexFn>,
    pub set_image_index: Option<SetImageIndexFn>,
    pub get_num_images: Option<GetNumImagesFn>,
    pub replace_image_index: Option<ReplaceImageIndexFn>,
    pub add_image_index: Option<AddImageIndexFn>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DiskControlExtCallback {
    pub set_eject_state: Option<SetEjectStateFn>,
    pub get_eject_state: Option<GetEjectStateFn>,
    pub get_image_index: Option<GetImageIndexFn>,
    pub set_image_index: Option<SetImageIndexFn>,
    pub get_num_images: Option<GetNumImagesFn>,
    pub replace_image_index: Option<ReplaceImageIndexFn>,
    pub add_image_index: Option<AddImageIndexFn>,
    pub set_initial_image: Option<SetInitialImageFn>,
    pub get_image_path: Option<GetImagePathFn>,
    pub get_image_label: Option<GetImageLabelFn>,
}

impl From<DiskControlCallback> for DiskControlExtCallback {
    fn from(v0: DiskControlCallback) -> Self {
        Self {
            set_eject_state: v0.set_eject_state,
            get_eject_state: v0.get_eject_state,
            get_image_index: v0.get_image_index,
            set_image_index: v0.set_image_index,
            get_num_images: v0.get_num_images,
            replace_image_index: v0.replace_image_index,
            add_image_index: v0.add_image_index,
            set_initial_image: None,
            get_image_path: None,
            get_image_label: None,
        }
    }
}

/// SET_HW_RENDER payload. The host fills `get_current_framebuffer` and `get_proc_address`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HwRenderCallback {
    /// `retro_hw_context_type`
    pub context_type: i32,
    pub context_reset: Option<HwContextResetFn>,
    pub get_current_framebuffer: Option<HwGetCurrentFramebufferFn>,
    pub get_proc_address: Option<HwGetProcAddressFn>,
    pub depth: bool,
    pub stencil: bool,
    pub bottom_left_origin: bool,
    pub version_major: c_uint,
    pub version_minor: c_uint,
    pub cache_context: bool,
    pub context_destroy: Option<HwContextResetFn>,
    pub debug_context: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HwRenderInterface {
    /// `retro_hw_render_interface_type`
    pub interface_type: c_uint,
    pub interface_version: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HwRenderContextNegotiationInterface {
    pub interface_type: c_uint,
    pub interface_version: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CoreOptionDisplay {
    pub key: *const c_char,
    pub visible: bool,
}

/// Opaque VFS file handle. Only ever handled by pointer; the host owns the real object.
#[repr(C)]
pub struct VfsFileHandle {
    _private: [u8; 0],
}

/// Opaque VFS directory handle.
#[repr(C)]
pub struct VfsDirHandle {
    _private: [u8; 0],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VfsInterface {
    // v1
    pub get_path: Option<VfsGetPathFn>,
    pub open: Option<VfsOpenFn>,
    pub close: Option<VfsCloseFn>,
    pub size: Option<VfsSizeFn>,
    pub tell: Option<VfsTellFn>,
    pub seek: Option<VfsSeekFn>,
    pub read: Option<VfsReadFn>,
    pub write: Option<VfsWriteFn>,
    pub flush: Option<VfsFlushFn>,
    pub remove: Option<VfsRemoveFn>,
    pub rename: Option<VfsRenameFn>,
    // v2
    pub truncate: Option<VfsTruncateFn>,
    // v3
    pub stat: Option<VfsStatFn>,
    pub mkdir: Option<VfsMkdirFn>,
    pub opendir: Option<VfsOpendirFn>,
    pub readdir: Option<VfsReaddirFn>,
    pub dirent_get_name: Option<VfsDirentGetNameFn>,
    pub dirent_is_dir: Option<VfsDirentIsDirFn>,
    pub closedir: Option<VfsClosedirFn>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VfsInterfaceInfo {
    /// In: the lowest version the core can work with.
    pub required_interface_version: u32,
    /// Out: the host's interface table.
    pub iface: *const VfsInterface,
}
