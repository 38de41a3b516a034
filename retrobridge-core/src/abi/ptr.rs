//! Raw pointer helpers.
//!
//! Every reinterpretation of a core-supplied pointer goes through one of these functions.
//! They share one contract: the pointer is either null or valid for the requested access
//! for the duration of the current callback. Null is always reported, never dereferenced.

use core::ffi::{c_char, c_void, CStr};

/// Upper bound when walking a core-supplied terminated array.
pub const MAX_TERMINATED_LEN: usize = 4096;

/// Copy a `T` out of an untyped payload pointer.
///
/// # Safety
/// `data` must be null or point to a readable, aligned `T`.
pub unsafe fn read<T: Copy>(data: *const c_void) -> Option<T> {
    if data.is_null() {
        return None;
    }
    // SAFETY: non-null, caller guarantees validity and alignment.
    Some(unsafe { data.cast::<T>().read() })
}

/// Write a `T` into an untyped payload pointer. Returns `false` for null.
///
/// # Safety
/// `data` must be null or point to a writable, aligned `T`.
pub unsafe fn write<T>(data: *mut c_void, value: T) -> bool {
    if data.is_null() {
        return false;
    }
    // SAFETY: non-null, caller guarantees validity and alignment.
    unsafe { data.cast::<T>().write(value) };
    true
}

/// Borrow an untyped payload pointer as `&mut T`.
///
/// # Safety
/// `data` must be null or point to a valid `T` not aliased for `'a`.
pub unsafe fn as_mut<'a, T>(data: *mut c_void) -> Option<&'a mut T> {
    // SAFETY: forwarded to the caller.
    unsafe { data.cast::<T>().as_mut() }
}

/// Borrow a C string. Invalid UTF-8 is replaced.
///
/// # Safety
/// `s` must be null or point to a NUL-terminated string that outlives `'a`.
pub unsafe fn c_str<'a>(s: *const c_char) -> Option<std::borrow::Cow<'a, str>> {
    if s.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller.
    Some(unsafe { CStr::from_ptr(s) }.to_string_lossy())
}

/// Owned copy of a C string.
///
/// # Safety
/// Same as [`c_str`].
pub unsafe fn c_string(s: *const c_char) -> Option<String> {
    unsafe { c_str(s) }.map(|s| s.into_owned())
}

/// Borrow `len` elements. A null pointer or zero length yields an empty slice.
///
/// # Safety
/// `data` must be null or valid for `len` reads of `T` for `'a`.
pub unsafe fn slice<'a, T>(data: *const T, len: usize) -> &'a [T] {
    if data.is_null() || len == 0 {
        return &[];
    }
    // SAFETY: non-null, caller guarantees the extent.
    unsafe { core::slice::from_raw_parts(data, len) }
}

/// Mutable variant of [`slice`].
///
/// # Safety
/// `data` must be null or valid for `len` writes of `T` and unaliased for `'a`.
pub unsafe fn slice_mut<'a, T>(data: *mut T, len: usize) -> &'a mut [T] {
    if data.is_null() || len == 0 {
        return &mut [];
    }
    // SAFETY: non-null, caller guarantees the extent.
    unsafe { core::slice::from_raw_parts_mut(data, len) }
}

/// Borrow an array terminated by an element for which `is_end` holds.
///
/// The terminator is not included. Walking stops after [`MAX_TERMINATED_LEN`] elements.
///
/// # Safety
/// `data` must be null or point to an array containing a terminator within the bound.
pub unsafe fn terminated<'a, T>(data: *const T, is_end: impl Fn(&T) -> bool) -> &'a [T] {
    if data.is_null() {
        return &[];
    }
    let mut len = 0;
    // SAFETY: every element up to and including the terminator is readable.
    while len < MAX_TERMINATED_LEN && !is_end(unsafe { &*data.add(len) }) {
        len += 1;
    }
    unsafe { slice(data, len) }
}

/// Copy `text` into a caller-provided C buffer of `len` bytes, truncating and terminating.
///
/// # Safety
/// `dst` must be null or valid for `len` byte writes.
pub unsafe fn copy_to_c_buffer(dst: *mut c_char, len: usize, text: &str) -> bool {
    let buf = unsafe { slice_mut(dst.cast::<u8>(), len) };
    let Some(room) = buf.len().checked_sub(1) else {
        return false;
    };
    let n = text.len().min(room);
    buf[..n].copy_from_slice(&text.as_bytes()[..n]);
    buf[n] = 0;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_payloads_are_reported() {
        unsafe {
            assert_eq!(read::<u32>(core::ptr::null()), None);
            assert!(!write::<u32>(core::ptr::null_mut(), 1));
            assert!(c_str(core::ptr::null()).is_none());
            assert!(slice::<u8>(core::ptr::null(), 10).is_empty());
        }
    }

    #[test]
    fn read_and_write_through_payload() {
        let mut slot = 0u32;
        let p = (&mut slot as *mut u32).cast::<c_void>();
        unsafe {
            assert!(write(p, 7u32));
            assert_eq!(read::<u32>(p), Some(7));
        }
    }

    #[test]
    fn terminated_array_excludes_terminator() {
        let data = [3u32, 4, 5, 0, 9];
        let items = unsafe { terminated(data.as_ptr(), |v| *v == 0) };
        assert_eq!(items, &[3, 4, 5]);
    }

    #[test]
    fn c_buffer_copy_truncates_and_terminates() {
        let mut buf = [0x7f as c_char; 4];
        assert!(unsafe { copy_to_c_buffer(buf.as_mut_ptr(), buf.len(), "disk-one") });
        let s = unsafe { c_str(buf.as_ptr()) }.unwrap();
        assert_eq!(s, "dis");
    }
}
