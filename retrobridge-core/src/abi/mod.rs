//! retrobridge ABI module
//!
//! This module defines the binary contract between:
//! - **Host**: `retrobridge-core` (this crate, the frontend side)
//! - **Core**: a dynamically loaded libretro plugin (API version 1)
//!
//! ## Layout rules
//! - Every struct that crosses the boundary is `#[repr(C)]` and declares its fields in the
//!   same order as `libretro.h`.
//! - Enumerated values written by the core (pixel format, context type, log level, ...) are
//!   stored as raw integers and converted with `TryFrom`; an out-of-range value is a
//!   protocol error, never a transmute.
//! - Fixed-size inline arrays are fixed-length Rust arrays behind bounds-checked accessors
//!   (see [`options::CoreOptionValues`]).
//! - Reading or writing through core-supplied pointers happens only in [`ptr`].
//!
//! [`validate`] checks the layouts against reference offsets at startup.

pub mod callbacks;
pub mod env;
pub mod keys;
pub mod options;
pub mod ptr;
pub mod types;
pub mod validate;

pub use callbacks::*;
pub use env::{EnvCommand, EnvFlags, ENVIRONMENT_EXPERIMENTAL, ENVIRONMENT_PRIVATE};
pub use types::*;

/// libretro API version implemented by the host.
///
/// Cores reporting a different value from `retro_api_version` are refused.
pub const API_VERSION: u32 = 1;

/// Device ids passed to `retro_input_state_t` / `retro_set_controller_port_device`.
pub mod device {
    pub const TYPE_SHIFT: u32 = 8;
    pub const MASK: u32 = (1 << TYPE_SHIFT) - 1;

    pub const NONE: u32 = 0;
    pub const JOYPAD: u32 = 1;
    pub const MOUSE: u32 = 2;
    pub const KEYBOARD: u32 = 3;
    pub const LIGHTGUN: u32 = 4;
    pub const ANALOG: u32 = 5;
    pub const POINTER: u32 = 6;

    /// Build a specialized device id on top of a base device.
    pub const fn subclass(base: u32, id: u32) -> u32 {
        ((id + 1) << TYPE_SHIFT) | base
    }

    /// Strip a subclass back to its base device.
    pub const fn base(device: u32) -> u32 {
        device & MASK
    }
}

/// Joypad button ids (`RETRO_DEVICE_ID_JOYPAD_*`).
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum JoypadButton {
    B = 0,
    Y = 1,
    Select = 2,
    Start = 3,
    Up = 4,
    Down = 5,
    Left = 6,
    Right = 7,
    A = 8,
    X = 9,
    L = 10,
    R = 11,
    L2 = 12,
    R2 = 13,
    L3 = 14,
    R3 = 15,
}

impl JoypadButton {
    pub const COUNT: usize = 16;

    pub const fn bit(self) -> u16 {
        1 << (self as u32)
    }
}

/// Joypad id returning every button as a bitmask (needs GET_INPUT_BITMASKS).
pub const DEVICE_ID_JOYPAD_MASK: u32 = 256;

pub mod analog {
    pub const INDEX_LEFT: u32 = 0;
    pub const INDEX_RIGHT: u32 = 1;
    pub const INDEX_BUTTON: u32 = 2;
    pub const ID_X: u32 = 0;
    pub const ID_Y: u32 = 1;
}

pub mod mouse {
    pub const ID_X: u32 = 0;
    pub const ID_Y: u32 = 1;
    pub const ID_LEFT: u32 = 2;
    pub const ID_RIGHT: u32 = 3;
    pub const ID_WHEELUP: u32 = 4;
    pub const ID_WHEELDOWN: u32 = 5;
    pub const ID_MIDDLE: u32 = 6;
    pub const ID_HORIZ_WHEELUP: u32 = 7;
    pub const ID_HORIZ_WHEELDOWN: u32 = 8;
    pub const ID_BUTTON_4: u32 = 9;
    pub const ID_BUTTON_5: u32 = 10;
    pub const ID_COUNT: usize = 11;
}

pub mod lightgun {
    pub const ID_SCREEN_X: u32 = 13;
    pub const ID_SCREEN_Y: u32 = 14;
    pub const ID_IS_OFFSCREEN: u32 = 15;
    pub const ID_TRIGGER: u32 = 2;
    pub const ID_RELOAD: u32 = 16;
    pub const ID_AUX_A: u32 = 3;
    pub const ID_AUX_B: u32 = 4;
    pub const ID_START: u32 = 6;
    pub const ID_SELECT: u32 = 7;
    pub const ID_AUX_C: u32 = 8;
    pub const ID_DPAD_UP: u32 = 9;
    pub const ID_DPAD_DOWN: u32 = 10;
    pub const ID_DPAD_LEFT: u32 = 11;
    pub const ID_DPAD_RIGHT: u32 = 12;

    // Deprecated relative ids, still answered.
    pub const ID_X: u32 = 0;
    pub const ID_Y: u32 = 1;
    pub const ID_CURSOR: u32 = 3;
    pub const ID_TURBO: u32 = 4;
    pub const ID_PAUSE: u32 = 5;

    pub const ID_COUNT: usize = 17;
}

pub mod pointer {
    pub const ID_X: u32 = 0;
    pub const ID_Y: u32 = 1;
    pub const ID_PRESSED: u32 = 2;
    pub const ID_COUNT: u32 = 3;
}

/// `retro_get_region` results.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Region {
    Ntsc = 0,
    Pal = 1,
}

impl TryFrom<u32> for Region {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Region::Ntsc),
            1 => Ok(Region::Pal),
            other => Err(other),
        }
    }
}

/// Memory ids for `retro_get_memory_data` / `retro_get_memory_size`.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MemoryKind {
    SaveRam = 0,
    Rtc = 1,
    SystemRam = 2,
    VideoRam = 3,
}

pub const MEMORY_MASK: u32 = 0xff;

/// `RETRO_LANGUAGE_*`.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English = 0,
    Japanese = 1,
    French = 2,
    Spanish = 3,
    German = 4,
    Italian = 5,
    Dutch = 6,
    PortugueseBrazil = 7,
    PortuguesePortugal = 8,
    Russian = 9,
    Korean = 10,
    ChineseTraditional = 11,
    ChineseSimplified = 12,
    Esperanto = 13,
    Polish = 14,
    Vietnamese = 15,
    Arabic = 16,
    Greek = 17,
    Turkish = 18,
    Slovak = 19,
    Persian = 20,
    Hebrew = 21,
    Asturian = 22,
}

/// Pixel formats a core may select with SET_PIXEL_FORMAT.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum PixelFormat {
    /// 0RGB1555, native endian, 16 bits per pixel. The libretro default.
    #[default]
    Rgb1555 = 0,
    /// XRGB8888, native endian, 32 bits per pixel.
    Xrgb8888 = 1,
    /// RGB565, native endian, 16 bits per pixel.
    Rgb565 = 2,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb1555 | PixelFormat::Rgb565 => 2,
            PixelFormat::Xrgb8888 => 4,
        }
    }
}

impl TryFrom<i32> for PixelFormat {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PixelFormat::Rgb1555),
            1 => Ok(PixelFormat::Xrgb8888),
            2 => Ok(PixelFormat::Rgb565),
            other => Err(other),
        }
    }
}

/// `retro_log_level`.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl TryFrom<i32> for LogLevel {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, i32> {
        match value {
            0 => Ok(LogLevel::Debug),
            1 => Ok(LogLevel::Info),
            2 => Ok(LogLevel::Warn),
            3 => Ok(LogLevel::Error),
            other => Err(other),
        }
    }
}

/// `retro_hw_context_type`.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HwContextType {
    #[default]
    None = 0,
    OpenGl = 1,
    OpenGles2 = 2,
    OpenGlCore = 3,
    OpenGles3 = 4,
    OpenGlesVersion = 5,
    Vulkan = 6,
    Direct3d = 7,
}

impl TryFrom<i32> for HwContextType {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, i32> {
        match value {
            0 => Ok(HwContextType::None),
            1 => Ok(HwContextType::OpenGl),
            2 => Ok(HwContextType::OpenGles2),
            3 => Ok(HwContextType::OpenGlCore),
            4 => Ok(HwContextType::OpenGles3),
            5 => Ok(HwContextType::OpenGlesVersion),
            6 => Ok(HwContextType::Vulkan),
            7 => Ok(HwContextType::Direct3d),
            other => Err(other),
        }
    }
}

/// `retro_hw_render_interface_type`.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HwRenderInterfaceType {
    Vulkan = 0,
    D3d9 = 1,
    D3d10 = 2,
    D3d11 = 3,
    D3d12 = 4,
    GsKitPs2 = 5,
}

/// Sentinel pointer passed to the video callback when a hardware frame is ready.
pub const HW_FRAME_BUFFER_VALID: usize = usize::MAX;

/// `retro_rumble_effect`.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RumbleEffect {
    Strong = 0,
    Weak = 1,
}

impl TryFrom<i32> for RumbleEffect {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, i32> {
        match value {
            0 => Ok(RumbleEffect::Strong),
            1 => Ok(RumbleEffect::Weak),
            other => Err(other),
        }
    }
}

/// `retro_message_target`.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MessageTarget {
    All = 0,
    Osd = 1,
    Log = 2,
}

/// `retro_message_type`.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MessageType {
    Notification = 0,
    NotificationAlt = 1,
    Status = 2,
    Progress = 3,
}

/// Serialization quirk bits (SET_SERIALIZATION_QUIRKS).
pub mod quirks {
    pub const INCOMPLETE: u64 = 1 << 0;
    pub const MUST_INITIALIZE: u64 = 1 << 1;
    pub const CORE_VARIABLE_SIZE: u64 = 1 << 2;
    pub const FRONT_VARIABLE_SIZE: u64 = 1 << 3;
    pub const SINGLE_SESSION: u64 = 1 << 4;
    pub const ENDIAN_DEPENDENT: u64 = 1 << 5;
    pub const PLATFORM_DEPENDENT: u64 = 1 << 6;
}

/// Memory descriptor flag bits (SET_MEMORY_MAPS).
pub mod memdesc {
    pub const CONST: u64 = 1 << 0;
    pub const BIGENDIAN: u64 = 1 << 1;
    pub const SYSTEM_RAM: u64 = 1 << 2;
    pub const SAVE_RAM: u64 = 1 << 3;
    pub const VIDEO_RAM: u64 = 1 << 4;
    pub const ALIGN_2: u64 = 1 << 16;
    pub const ALIGN_4: u64 = 2 << 16;
    pub const ALIGN_8: u64 = 3 << 16;
    pub const MINSIZE_2: u64 = 1 << 24;
    pub const MINSIZE_4: u64 = 2 << 24;
    pub const MINSIZE_8: u64 = 3 << 24;
}

/// SIMD capability bits returned by the perf interface's `get_cpu_features`.
pub mod simd {
    pub const SSE: u64 = 1 << 0;
    pub const SSE2: u64 = 1 << 1;
    pub const VMX: u64 = 1 << 2;
    pub const VMX128: u64 = 1 << 3;
    pub const AVX: u64 = 1 << 4;
    pub const NEON: u64 = 1 << 5;
    pub const SSE3: u64 = 1 << 6;
    pub const SSSE3: u64 = 1 << 7;
    pub const MMX: u64 = 1 << 8;
    pub const MMXEXT: u64 = 1 << 9;
    pub const SSE4: u64 = 1 << 10;
    pub const SSE42: u64 = 1 << 11;
    pub const AVX2: u64 = 1 << 12;
    pub const VFPU: u64 = 1 << 13;
    pub const PS: u64 = 1 << 14;
    pub const AES: u64 = 1 << 15;
    pub const VFPV3: u64 = 1 << 16;
    pub const VFPV4: u64 = 1 << 17;
    pub const POPCNT: u64 = 1 << 18;
    pub const MOVBE: u64 = 1 << 19;
    pub const CMOV: u64 = 1 << 20;
    pub const ASIMD: u64 = 1 << 21;
}

/// VFS constants.
pub mod vfs {
    /// Highest VFS interface version the host implements.
    pub const INTERFACE_VERSION: u32 = 3;

    pub const FILE_ACCESS_READ: u32 = 1 << 0;
    pub const FILE_ACCESS_WRITE: u32 = 1 << 1;
    pub const FILE_ACCESS_READ_WRITE: u32 = FILE_ACCESS_READ | FILE_ACCESS_WRITE;
    pub const FILE_ACCESS_UPDATE_EXISTING: u32 = 1 << 2;

    pub const FILE_ACCESS_HINT_NONE: u32 = 0;
    pub const FILE_ACCESS_HINT_FREQUENT_ACCESS: u32 = 1 << 0;

    pub const SEEK_POSITION_START: i32 = 0;
    pub const SEEK_POSITION_CURRENT: i32 = 1;
    pub const SEEK_POSITION_END: i32 = 2;

    pub const STAT_IS_VALID: i32 = 1 << 0;
    pub const STAT_IS_DIRECTORY: i32 = 1 << 1;
    pub const STAT_IS_CHARACTER_SPECIAL: i32 = 1 << 2;
}

/// GET_AUDIO_VIDEO_ENABLE result bits.
pub mod av_enable {
    pub const VIDEO: i32 = 1 << 0;
    pub const AUDIO: i32 = 1 << 1;
    pub const FAST_SAVESTATES: i32 = 1 << 2;
    pub const HARD_DISABLE_AUDIO: i32 = 1 << 3;
}

/// Memory access bits of `retro_framebuffer`.
pub const MEMORY_ACCESS_WRITE: u32 = 1 << 0;
pub const MEMORY_ACCESS_READ: u32 = 1 << 1;
pub const MEMORY_TYPE_CACHED: u32 = 1 << 0;

/// Interface versions the host answers with.
pub const CORE_OPTIONS_VERSION: u32 = 1;
pub const DISK_CONTROL_INTERFACE_VERSION: u32 = 1;
pub const MESSAGE_INTERFACE_VERSION: u32 = 1;
