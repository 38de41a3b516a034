//! VFS interface (version 3) backed by `std::fs`.
//!
//! Handles given to the core are boxed host objects cast to the opaque libretro handle
//! types; `close` / `closedir` take ownership back. Every function reports failure with the
//! libretro sentinel (`-1`, null or `false`) and never panics.

use core::ffi::{c_char, c_int, c_uint, c_void};
use std::ffi::CString;
use std::fs::{self, File, OpenOptions, ReadDir};
use std::io::{Read, Seek, SeekFrom, Write};

use tracing::{debug, trace};

use crate::abi::{ptr, vfs, VfsDirHandle, VfsFileHandle, VfsInterface};

struct VfsFile {
    path: CString,
    file: File,
}

struct VfsDir {
    entries: ReadDir,
    include_hidden: bool,
    current: Option<(CString, bool)>,
}

static INTERFACE: VfsInterface = VfsInterface {
    get_path: Some(get_path),
    open: Some(open),
    close: Some(close),
    size: Some(size),
    tell: Some(tell),
    seek: Some(seek),
    read: Some(read),
    write: Some(write),
    flush: Some(flush),
    remove: Some(remove),
    rename: Some(rename),
    truncate: Some(truncate),
    stat: Some(stat),
    mkdir: Some(mkdir),
    opendir: Some(opendir),
    readdir: Some(readdir),
    dirent_get_name: Some(dirent_get_name),
    dirent_is_dir: Some(dirent_is_dir),
    closedir: Some(closedir),
};

/// The host's VFS table, valid for the life of the process.
pub fn interface() -> *const VfsInterface {
    &INTERFACE
}

unsafe fn file<'a>(stream: *mut VfsFileHandle) -> Option<&'a mut VfsFile> {
    unsafe { stream.cast::<VfsFile>().as_mut() }
}

unsafe fn dir<'a>(stream: *mut VfsDirHandle) -> Option<&'a mut VfsDir> {
    unsafe { stream.cast::<VfsDir>().as_mut() }
}

fn status<E>(result: Result<(), E>) -> c_int {
    if result.is_ok() { 0 } else { -1 }
}

unsafe extern "C" fn get_path(stream: *mut VfsFileHandle) -> *const c_char {
    unsafe { file(stream) }.map_or(core::ptr::null(), |f| f.path.as_ptr())
}

unsafe extern "C" fn open(path: *const c_char, mode: c_uint, _hints: c_uint) -> *mut VfsFileHandle {
    let Some(name) = (unsafe { ptr::c_string(path) }) else {
        return core::ptr::null_mut();
    };
    let mut options = OpenOptions::new();
    match mode & vfs::FILE_ACCESS_READ_WRITE {
        vfs::FILE_ACCESS_READ => options.read(true),
        vfs::FILE_ACCESS_WRITE => options.write(true),
        vfs::FILE_ACCESS_READ_WRITE => options.read(true).write(true),
        _ => return core::ptr::null_mut(),
    };
    if mode & vfs::FILE_ACCESS_WRITE != 0 && mode & vfs::FILE_ACCESS_UPDATE_EXISTING == 0 {
        options.create(true).truncate(true);
    }
    match options.open(&name) {
        Ok(handle) => {
            trace!(path = %name, mode, "vfs open");
            let Ok(path) = CString::new(name) else {
                return core::ptr::null_mut();
            };
            Box::into_raw(Box::new(VfsFile { path, file: handle })).cast()
        }
        Err(e) => {
            debug!(path = %name, error = %e, "vfs open failed");
            core::ptr::null_mut()
        }
    }
}

unsafe extern "C" fn close(stream: *mut VfsFileHandle) -> c_int {
    if stream.is_null() {
        return -1;
    }
    // SAFETY: produced by `open` and not closed before.
    drop(unsafe { Box::from_raw(stream.cast::<VfsFile>()) });
    0
}

unsafe extern "C" fn size(stream: *mut VfsFileHandle) -> i64 {
    unsafe { file(stream) }
        .and_then(|f| f.file.metadata().ok())
        .map_or(-1, |m| m.len() as i64)
}

unsafe extern "C" fn truncate(stream: *mut VfsFileHandle, length: i64) -> i64 {
    let Some(f) = (unsafe { file(stream) }) else {
        return -1;
    };
    let Ok(length) = u64::try_from(length) else {
        return -1;
    };
    status(f.file.set_len(length)) as i64
}

unsafe extern "C" fn tell(stream: *mut VfsFileHandle) -> i64 {
    unsafe { file(stream) }
        .and_then(|f| f.file.stream_position().ok())
        .map_or(-1, |p| p as i64)
}

unsafe extern "C" fn seek(stream: *mut VfsFileHandle, offset: i64, seek_position: c_int) -> i64 {
    let Some(f) = (unsafe { file(stream) }) else {
        return -1;
    };
    let from = match seek_position {
        vfs::SEEK_POSITION_START => match u64::try_from(offset) {
            Ok(offset) => SeekFrom::Start(offset),
            Err(_) => return -1,
        },
        vfs::SEEK_POSITION_CURRENT => SeekFrom::Current(offset),
        vfs::SEEK_POSITION_END => SeekFrom::End(offset),
        _ => return -1,
    };
    f.file.seek(from).map_or(-1, |p| p as i64)
}

unsafe extern "C" fn read(stream: *mut VfsFileHandle, s: *mut c_void, len: u64) -> i64 {
    let Some(f) = (unsafe { file(stream) }) else {
        return -1;
    };
    let buf = unsafe { ptr::slice_mut(s.cast::<u8>(), len as usize) };
    let mut filled = 0;
    while filled < buf.len() {
        match f.file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => return -1,
        }
    }
    filled as i64
}

unsafe extern "C" fn write(stream: *mut VfsFileHandle, s: *const c_void, len: u64) -> i64 {
    let Some(f) = (unsafe { file(stream) }) else {
        return -1;
    };
    let buf = unsafe { ptr::slice(s.cast::<u8>(), len as usize) };
    match f.file.write_all(buf) {
        Ok(()) => buf.len() as i64,
        Err(_) => -1,
    }
}

unsafe extern "C" fn flush(stream: *mut VfsFileHandle) -> c_int {
    match unsafe { file(stream) } {
        Some(f) => status(f.file.flush()),
        None => -1,
    }
}

unsafe extern "C" fn remove(path: *const c_char) -> c_int {
    let Some(path) = (unsafe { ptr::c_string(path) }) else {
        return -1;
    };
    let result = match fs::metadata(&path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir(&path),
        _ => fs::remove_file(&path),
    };
    status(result)
}

unsafe extern "C" fn rename(old_path: *const c_char, new_path: *const c_char) -> c_int {
    let from = unsafe { ptr::c_string(old_path) };
    let to = unsafe { ptr::c_string(new_path) };
    let (Some(from), Some(to)) = (from, to) else {
        return -1;
    };
    status(fs::rename(from, to))
}

unsafe extern "C" fn stat(path: *const c_char, size: *mut i32) -> c_int {
    let Some(path) = (unsafe { ptr::c_string(path) }) else {
        return 0;
    };
    let Ok(meta) = fs::metadata(&path) else {
        return 0;
    };
    if !size.is_null() {
        let len = i32::try_from(meta.len()).unwrap_or(i32::MAX);
        unsafe { size.write(len) };
    }
    let mut flags = vfs::STAT_IS_VALID;
    if meta.is_dir() {
        flags |= vfs::STAT_IS_DIRECTORY;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        if meta.file_type().is_char_device() {
            flags |= vfs::STAT_IS_CHARACTER_SPECIAL;
        }
    }
    flags
}

/// 0 on success, -2 if the directory already exists, -1 otherwise.
unsafe extern "C" fn mkdir(dir: *const c_char) -> c_int {
    let Some(dir) = (unsafe { ptr::c_string(dir) }) else {
        return -1;
    };
    match fs::create_dir(&dir) {
        Ok(()) => 0,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => -2,
        Err(_) => -1,
    }
}

unsafe extern "C" fn opendir(dir: *const c_char, include_hidden: bool) -> *mut VfsDirHandle {
    let Some(dir) = (unsafe { ptr::c_string(dir) }) else {
        return core::ptr::null_mut();
    };
    match fs::read_dir(&dir) {
        Ok(entries) => Box::into_raw(Box::new(VfsDir {
            entries,
            include_hidden,
            current: None,
        }))
        .cast(),
        Err(_) => core::ptr::null_mut(),
    }
}

unsafe extern "C" fn readdir(dirstream: *mut VfsDirHandle) -> bool {
    let Some(d) = (unsafe { dir(dirstream) }) else {
        return false;
    };
    d.current = None;
    for entry in d.entries.by_ref() {
        let Ok(entry) = entry else {
            continue;
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if !d.include_hidden && name.starts_with('.') {
            continue;
        }
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        let Ok(name) = CString::new(name) else {
            continue;
        };
        d.current = Some((name, is_dir));
        return true;
    }
    false
}

unsafe extern "C" fn dirent_get_name(dirstream: *mut VfsDirHandle) -> *const c_char {
    unsafe { dir(dirstream) }
        .and_then(|d| d.current.as_ref())
        .map_or(core::ptr::null(), |(name, _)| name.as_ptr())
}

unsafe extern "C" fn dirent_is_dir(dirstream: *mut VfsDirHandle) -> bool {
    unsafe { dir(dirstream) }
        .and_then(|d| d.current.as_ref())
        .is_some_and(|(_, is_dir)| *is_dir)
}

unsafe extern "C" fn closedir(dirstream: *mut VfsDirHandle) -> c_int {
    if dirstream.is_null() {
        return -1;
    }
    // SAFETY: produced by `opendir` and not closed before.
    drop(unsafe { Box::from_raw(dirstream.cast::<VfsDir>()) });
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn iface() -> &'static VfsInterface {
        unsafe { &*interface() }
    }

    fn c(path: &Path) -> CString {
        CString::new(path.to_str().unwrap()).unwrap()
    }

    #[test]
    fn write_seek_read_truncate() {
        let dir = tempfile::tempdir().unwrap();
        let path = c(&dir.path().join("save.srm"));
        let v = iface();
        unsafe {
            let h = v.open.unwrap()(path.as_ptr(), vfs::FILE_ACCESS_READ_WRITE, 0);
            assert!(!h.is_null());
            assert_eq!(ptr::c_str(v.get_path.unwrap()(h)).as_deref(), path.to_str().ok());

            let data = b"abcdefgh";
            assert_eq!(v.write.unwrap()(h, data.as_ptr().cast(), 8), 8);
            assert_eq!(v.tell.unwrap()(h), 8);
            assert_eq!(v.size.unwrap()(h), 8);
            assert_eq!(v.seek.unwrap()(h, 2, vfs::SEEK_POSITION_START), 2);

            let mut buf = [0u8; 16];
            assert_eq!(v.read.unwrap()(h, buf.as_mut_ptr().cast(), 16), 6);
            assert_eq!(&buf[..6], b"cdefgh");

            assert_eq!(v.seek.unwrap()(h, -3, vfs::SEEK_POSITION_END), 5);
            assert_eq!(v.truncate.unwrap()(h, 4), 0);
            assert_eq!(v.size.unwrap()(h), 4);
            assert_eq!(v.flush.unwrap()(h), 0);
            assert_eq!(v.close.unwrap()(h), 0);
        }
        assert_eq!(std::fs::read(dir.path().join("save.srm")).unwrap(), b"abcd");
    }

    #[test]
    fn update_existing_requires_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = c(&dir.path().join("missing.bin"));
        let mode = vfs::FILE_ACCESS_WRITE | vfs::FILE_ACCESS_UPDATE_EXISTING;
        unsafe {
            assert!(iface().open.unwrap()(path.as_ptr(), mode, 0).is_null());
            assert!(iface().open.unwrap()(path.as_ptr(), vfs::FILE_ACCESS_READ, 0).is_null());
            assert!(iface().open.unwrap()(path.as_ptr(), 0, 0).is_null());
        }
    }

    #[test]
    fn stat_mkdir_and_directory_listing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"12345").unwrap();
        std::fs::write(dir.path().join(".hidden"), b"").unwrap();
        let sub = c(&dir.path().join("sub"));
        let v = iface();
        unsafe {
            assert_eq!(v.mkdir.unwrap()(sub.as_ptr()), 0);
            assert_eq!(v.mkdir.unwrap()(sub.as_ptr()), -2);

            let mut size = 0;
            let file = c(&dir.path().join("a.txt"));
            assert_eq!(v.stat.unwrap()(file.as_ptr(), &mut size), vfs::STAT_IS_VALID);
            assert_eq!(size, 5);
            let flags = v.stat.unwrap()(sub.as_ptr(), core::ptr::null_mut());
            assert_ne!(flags & vfs::STAT_IS_DIRECTORY, 0);
            assert_eq!(v.stat.unwrap()(c(&dir.path().join("nope")).as_ptr(), &mut size), 0);

            let root = c(dir.path());
            let d = v.opendir.unwrap()(root.as_ptr(), false);
            assert!(!d.is_null());
            let mut seen = Vec::new();
            while v.readdir.unwrap()(d) {
                let name = ptr::c_string(v.dirent_get_name.unwrap()(d)).unwrap();
                seen.push((name, v.dirent_is_dir.unwrap()(d)));
            }
            assert_eq!(v.closedir.unwrap()(d), 0);
            seen.sort();
            assert_eq!(seen, vec![("a.txt".to_string(), false), ("sub".to_string(), true)]);
        }
    }

    #[test]
    fn rename_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("old.sav");
        let to = dir.path().join("new.sav");
        std::fs::write(&from, b"x").unwrap();
        let v = iface();
        unsafe {
            assert_eq!(v.rename.unwrap()(c(&from).as_ptr(), c(&to).as_ptr()), 0);
            assert!(to.exists() && !from.exists());
            assert_eq!(v.remove.unwrap()(c(&to).as_ptr()), 0);
            assert_eq!(v.remove.unwrap()(c(&to).as_ptr()), -1);
        }
    }

    #[test]
    fn null_handles_are_rejected() {
        let v = iface();
        unsafe {
            assert_eq!(v.close.unwrap()(core::ptr::null_mut()), -1);
            assert_eq!(v.size.unwrap()(core::ptr::null_mut()), -1);
            assert!(v.get_path.unwrap()(core::ptr::null_mut()).is_null());
            assert!(!v.readdir.unwrap()(core::ptr::null_mut()));
        }
    }
}
