//! Structural self-check of the ABI layouts.
//!
//! [`check_layouts`] compares the compiled size and field offsets of the boundary structs
//! against reference values taken from `libretro.h` on LP64 targets, and against the
//! `libretro-sys` definitions for the structs both crates describe. The host runs it once
//! before loading any core; a mismatch is fatal.

use core::mem::{offset_of, size_of};

use super::options::{CoreOptionDefinition, CoreOptionValue, CoreOptionsIntl};
use super::types::*;
use crate::error::AbiError;

/// One measured layout fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutCheck {
    pub item: &'static str,
    pub expected: usize,
    pub actual: usize,
}

macro_rules! size {
    ($ty:ty = $n:expr) => {
        LayoutCheck {
            item: concat!("sizeof(", stringify!($ty), ")"),
            expected: $n,
            actual: size_of::<$ty>(),
        }
    };
}

macro_rules! offset {
    ($ty:ty, $field:ident = $n:expr) => {
        LayoutCheck {
            item: concat!(stringify!($ty), ".", stringify!($field)),
            expected: $n,
            actual: offset_of!($ty, $field),
        }
    };
}

/// Reference layout for 64-bit pointer targets.
#[cfg(target_pointer_width = "64")]
pub fn reference_checks() -> Vec<LayoutCheck> {
    vec![
        size!(SystemInfo = 32),
        offset!(SystemInfo, need_fullpath = 24),
        offset!(SystemInfo, block_extract = 25),
        size!(GameGeometry = 20),
        offset!(GameGeometry, aspect_ratio = 16),
        size!(SystemTiming = 16),
        size!(SystemAvInfo = 40),
        offset!(SystemAvInfo, timing = 24),
        size!(GameInfo = 32),
        offset!(GameInfo, size = 16),
        offset!(GameInfo, meta = 24),
        size!(GameInfoExt = 80),
        offset!(GameInfoExt, data = 56),
        offset!(GameInfoExt, size = 64),
        offset!(GameInfoExt, file_in_archive = 72),
        offset!(GameInfoExt, persistent_data = 73),
        size!(SystemContentInfoOverride = 16),
        offset!(SystemContentInfoOverride, persistent_data = 9),
        size!(Variable = 16),
        size!(Message = 16),
        size!(MessageExt = 32),
        offset!(MessageExt, level = 16),
        offset!(MessageExt, progress = 28),
        size!(InputDescriptor = 24),
        offset!(InputDescriptor, description = 16),
        size!(Framebuffer = 40),
        offset!(Framebuffer, pitch = 16),
        offset!(Framebuffer, format = 24),
        offset!(Framebuffer, memory_flags = 32),
        size!(MemoryDescriptor = 64),
        offset!(MemoryDescriptor, addrspace = 56),
        size!(MemoryMap = 16),
        size!(ControllerDescription = 16),
        size!(ControllerInfo = 16),
        size!(SubsystemRomInfo = 40),
        offset!(SubsystemRomInfo, required = 18),
        offset!(SubsystemRomInfo, memory = 24),
        size!(SubsystemInfo = 32),
        offset!(SubsystemInfo, id = 28),
        size!(PerfCounter = 40),
        offset!(PerfCounter, registered = 32),
        size!(PerfCallback = 56),
        size!(CameraCallback = 64),
        offset!(CameraCallback, start = 16),
        size!(LocationCallback = 48),
        size!(MidiInterface = 40),
        size!(SensorInterface = 16),
        size!(AudioCallback = 16),
        size!(FrameTimeCallback = 16),
        offset!(FrameTimeCallback, reference = 8),
        size!(FastforwardingOverride = 8),
        offset!(FastforwardingOverride, fastforward = 4),
        size!(DiskControlCallback = 56),
        size!(DiskControlExtCallback = 80),
        size!(HwRenderCallback = 64),
        offset!(HwRenderCallback, context_reset = 8),
        offset!(HwRenderCallback, get_proc_address = 24),
        offset!(HwRenderCallback, depth = 32),
        offset!(HwRenderCallback, bottom_left_origin = 34),
        offset!(HwRenderCallback, version_major = 36),
        offset!(HwRenderCallback, cache_context = 44),
        offset!(HwRenderCallback, context_destroy = 48),
        offset!(HwRenderCallback, debug_context = 56),
        size!(CoreOptionValue = 16),
        size!(CoreOptionDefinition = 2080),
        offset!(CoreOptionDefinition, values = 24),
        offset!(CoreOptionDefinition, default_value = 2072),
        size!(CoreOptionsIntl = 16),
        size!(CoreOptionDisplay = 16),
        size!(VfsInterface = 152),
        offset!(VfsInterface, truncate = 88),
        offset!(VfsInterface, stat = 96),
        offset!(VfsInterface, closedir = 144),
        size!(VfsInterfaceInfo = 16),
        offset!(VfsInterfaceInfo, iface = 8),
    ]
}

/// No reference table is kept for other pointer widths; only the cross-crate check runs.
#[cfg(not(target_pointer_width = "64"))]
pub fn reference_checks() -> Vec<LayoutCheck> {
    Vec::new()
}

/// Sizes compared with the `libretro-sys` definitions of the same structs.
pub fn libretro_sys_checks() -> Vec<LayoutCheck> {
    use libretro_sys as sys;

    vec![
        size!(SystemInfo = size_of::<sys::SystemInfo>()),
        size!(GameGeometry = size_of::<sys::GameGeometry>()),
        size!(SystemTiming = size_of::<sys::SystemTiming>()),
        size!(SystemAvInfo = size_of::<sys::SystemAvInfo>()),
        size!(GameInfo = size_of::<sys::GameInfo>()),
        size!(Variable = size_of::<sys::Variable>()),
        size!(Message = size_of::<sys::Message>()),
        size!(InputDescriptor = size_of::<sys::InputDescriptor>()),
    ]
}

/// Run every layout check. Returns the first mismatch.
pub fn check_layouts() -> Result<(), AbiError> {
    let checks = reference_checks().into_iter().chain(libretro_sys_checks());
    for check in checks {
        if check.expected != check.actual {
            return Err(AbiError::LayoutMismatch {
                item: check.item,
                expected: check.expected,
                actual: check.actual,
            });
        }
    }
    Ok(())
}
