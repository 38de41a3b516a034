//! Frame bridge: forwards the core's video callback to a rendering consumer.
//!
//! Responsibilities:
//! - Own the current pixel format (set through SET_PIXEL_FORMAT, default 0RGB1555). The
//!   environment dispatcher reads and writes it here; there is no second copy.
//! - Software frames: reinterpret the core pointer according to the pixel format and lend
//!   it to the [`FrameSink`] as a [`FrameView`] for the duration of the callback.
//! - Hardware frames: read back `width * height * 4` bytes from the [`HwContext`] into a
//!   reusable buffer, forward them as a vertically flipped XRGB8888 view, then swap.
//! - Null frames are dupes and are skipped.
//!
//! Nothing on the steady-state path allocates.

pub mod convert;
pub mod mailbox;

use std::ffi::CStr;

use tracing::{debug, warn};

use crate::abi::{GameGeometry, HwContextType, HwRenderCallback, PixelFormat, ProcAddress};

pub use mailbox::{frame_mailbox, Frame, FrameReceiver, MailboxSender};

/// Borrowed frame, valid only inside [`FrameSink::present`].
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    /// `height * pitch` bytes.
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    /// Bytes per row in `data`.
    pub pitch: usize,
    pub format: PixelFormat,
    /// Rows are stored bottom-up.
    pub flipped: bool,
}

impl<'a> FrameView<'a> {
    /// Row `y` in display order (top row is 0), `width` pixels long.
    pub fn row(&self, y: u32) -> Option<&'a [u8]> {
        if y >= self.height {
            return None;
        }
        let src_y = (if self.flipped { self.height - 1 - y } else { y }) as usize;
        let start = src_y * self.pitch;
        let len = self.width as usize * self.format.bytes_per_pixel();
        self.data.get(start..start + len)
    }
}

/// Rendering consumer.
pub trait FrameSink {
    /// Consume one frame. Copy `frame.data` to keep it past the call.
    fn present(&mut self, frame: &FrameView<'_>);

    /// The core changed its geometry (SET_GEOMETRY / SET_SYSTEM_AV_INFO).
    fn geometry_changed(&mut self, _geometry: &GameGeometry) {}

    /// The core asked for a rotation (clockwise quarter turns).
    fn rotation_changed(&mut self, _quarter_turns: u32) {}
}

/// Graphics context used for hardware-rendered cores.
pub trait HwContext {
    /// Whether the context can serve `kind` at the requested version.
    fn supports(&self, kind: HwContextType, major: u32, minor: u32) -> bool;

    /// Answer to GET_PREFERRED_HW_RENDER.
    fn preferred(&self) -> HwContextType;

    /// Read `width * height` pixels of the current framebuffer as XRGB8888 (BGRA bytes on
    /// little-endian), bottom row first, into `out`.
    fn read_pixels(&mut self, width: u32, height: u32, out: &mut [u8]) -> bool;

    /// Present the rendered frame.
    fn swap_buffers(&mut self);

    /// Framebuffer object the core should render into.
    fn current_framebuffer(&self) -> usize;

    /// Resolve a graphics API symbol for the core.
    fn proc_address(&self, symbol: &CStr) -> ProcAddress;
}

/// Counters kept by [`FrameBridge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub presented: u64,
    pub duplicated: u64,
    pub rejected: u64,
}

/// Host-side video state.
pub struct FrameBridge {
    enabled: bool,
    format: PixelFormat,
    use_core_rotation: bool,
    rotation: u32,
    hw_render: Option<HwRenderCallback>,
    sink: Option<Box<dyn FrameSink>>,
    context: Option<Box<dyn HwContext>>,
    readback: Vec<u8>,
    stats: FrameStats,
}

impl Default for FrameBridge {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FrameBridge {
    pub fn new(use_core_rotation: bool) -> Self {
        Self {
            enabled: true,
            format: PixelFormat::default(),
            use_core_rotation,
            rotation: 0,
            hw_render: None,
            sink: None,
            context: None,
            readback: Vec::new(),
            stats: FrameStats::default(),
        }
    }

    pub fn set_sink(&mut self, sink: Option<Box<dyn FrameSink>>) {
        self.sink = sink;
    }

    pub fn set_context(&mut self, context: Option<Box<dyn HwContext>>) {
        self.context = context;
    }

    pub fn context(&self) -> Option<&dyn HwContext> {
        self.context.as_deref()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    /// SET_PIXEL_FORMAT. Unknown values are refused and leave the format unchanged.
    pub fn set_pixel_format(&mut self, raw: i32) -> bool {
        match PixelFormat::try_from(raw) {
            Ok(format) => {
                debug!(?format, "pixel format set");
                self.format = format;
                true
            }
            Err(raw) => {
                warn!(raw, "unknown pixel format refused");
                false
            }
        }
    }

    pub fn rotation(&self) -> u32 {
        self.rotation
    }

    /// SET_ROTATION. Refused when the host leaves rotation to the core.
    pub fn set_rotation(&mut self, quarter_turns: u32) -> bool {
        if !self.use_core_rotation {
            return false;
        }
        self.rotation = quarter_turns % 4;
        if let Some(sink) = self.sink.as_mut() {
            sink.rotation_changed(self.rotation);
        }
        true
    }

    pub fn geometry_changed(&mut self, geometry: &GameGeometry) {
        if let Some(sink) = self.sink.as_mut() {
            sink.geometry_changed(geometry);
        }
    }

    /// Whether the core registered a hardware render callback.
    pub fn hw_accelerated(&self) -> bool {
        self.hw_render.is_some()
    }

    /// The core's hardware render registration (context_reset / context_destroy).
    pub fn hw_render(&self) -> Option<HwRenderCallback> {
        self.hw_render
    }

    /// Accept a SET_HW_RENDER registration if the context can serve it.
    pub fn register_hw_render(&mut self, callback: HwRenderCallback) -> bool {
        let Some(context) = self.context.as_deref() else {
            debug!("hardware render requested without a graphics context");
            return false;
        };
        let kind = match HwContextType::try_from(callback.context_type) {
            Ok(kind) => kind,
            Err(raw) => {
                warn!(raw, "unknown hardware context type");
                return false;
            }
        };
        if !context.supports(kind, callback.version_major, callback.version_minor) {
            debug!(
                ?kind,
                major = callback.version_major,
                minor = callback.version_minor,
                "hardware context not supported"
            );
            return false;
        }
        self.hw_render = Some(callback);
        true
    }

    pub fn clear_hw_render(&mut self) {
        self.hw_render = None;
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// `retro_video_refresh_t`.
    ///
    /// # Safety
    /// For software frames `data` must be null or valid for `height * pitch` bytes.
    pub unsafe fn on_frame(&mut self, data: *const u8, width: u32, height: u32, pitch: usize) {
        if !self.enabled {
            return;
        }
        let Some(sink) = self.sink.as_deref_mut() else {
            return;
        };
        if data.is_null() {
            self.stats.duplicated += 1;
            return;
        }
        if width == 0 || height == 0 {
            debug!(width, height, "empty frame");
            self.stats.rejected += 1;
            return;
        }

        if self.hw_render.is_some() {
            let Some(context) = self.context.as_deref_mut() else {
                return;
            };
            let len = width as usize * height as usize * 4;
            self.readback.resize(len, 0);
            if !context.read_pixels(width, height, &mut self.readback) {
                self.stats.rejected += 1;
                return;
            }
            sink.present(&FrameView {
                data: &self.readback,
                width,
                height,
                pitch: width as usize * 4,
                format: PixelFormat::Xrgb8888,
                flipped: true,
            });
            context.swap_buffers();
            self.stats.presented += 1;
            return;
        }

        let row = width as usize * self.format.bytes_per_pixel();
        if pitch < row {
            warn!(width, pitch, format = ?self.format, "frame pitch smaller than a row");
            self.stats.rejected += 1;
            return;
        }
        // SAFETY: the core guarantees `height * pitch` readable bytes during the callback.
        let bytes = unsafe { crate::abi::ptr::slice(data, height as usize * pitch) };
        sink.present(&FrameView {
            data: bytes,
            width,
            height,
            pitch,
            format: self.format,
            flipped: false,
        });
        self.stats.presented += 1;
    }
}
