//! Pixel conversion to RGBA8.
//!
//! Channel expansion replicates the high bits into the low bits so full intensity maps to
//! 255 and zero maps to 0 in every format.

use super::FrameView;
use crate::abi::PixelFormat;

#[inline]
pub fn expand5(x: u16) -> u8 {
    let x = (x & 0x1f) as u8;
    (x << 3) | (x >> 2)
}

#[inline]
pub fn expand6(x: u16) -> u8 {
    let x = (x & 0x3f) as u8;
    (x << 2) | (x >> 4)
}

/// 0RGB1555 -> [r, g, b, 255]
#[inline]
pub fn rgb1555(px: u16) -> [u8; 4] {
    [expand5(px >> 10), expand5(px >> 5), expand5(px), 0xff]
}

/// RGB565 -> [r, g, b, 255]
#[inline]
pub fn rgb565(px: u16) -> [u8; 4] {
    [expand5(px >> 11), expand6(px >> 5), expand5(px), 0xff]
}

/// XRGB8888 -> [r, g, b, 255]. The X byte is ignored.
#[inline]
pub fn xrgb8888(px: u32) -> [u8; 4] {
    [(px >> 16) as u8, (px >> 8) as u8, px as u8, 0xff]
}

fn convert_row(format: PixelFormat, src: &[u8], dst: &mut [u8]) {
    match format {
        PixelFormat::Rgb1555 => {
            for (s, d) in src.chunks_exact(2).zip(dst.chunks_exact_mut(4)) {
                d.copy_from_slice(&rgb1555(u16::from_ne_bytes([s[0], s[1]])));
            }
        }
        PixelFormat::Rgb565 => {
            for (s, d) in src.chunks_exact(2).zip(dst.chunks_exact_mut(4)) {
                d.copy_from_slice(&rgb565(u16::from_ne_bytes([s[0], s[1]])));
            }
        }
        PixelFormat::Xrgb8888 => {
            for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
                d.copy_from_slice(&xrgb8888(u32::from_ne_bytes([s[0], s[1], s[2], s[3]])));
            }
        }
    }
}

/// Convert a frame into tightly packed, top-down RGBA8.
///
/// `out` is resized to `width * height * 4`; once its capacity is large enough no
/// allocation happens.
pub fn to_rgba(frame: &FrameView<'_>, out: &mut Vec<u8>) {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let row_in = width * frame.format.bytes_per_pixel();
    let row_out = width * 4;

    out.clear();
    if row_out == 0 || height == 0 {
        return;
    }
    out.resize(row_out * height, 0);

    for (y, dst) in out.chunks_exact_mut(row_out).enumerate() {
        let src_y = if frame.flipped { height - 1 - y } else { y };
        let start = src_y * frame.pitch;
        let Some(src) = frame.data.get(start..start + row_in) else {
            break;
        };
        convert_row(frame.format, src, dst);
    }
}
