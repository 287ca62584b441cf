//! File-system interface offered to cores
//!
//! Version 2 of the VFS interface backed by `std::fs`. A handle is a boxed
//! [`VfsFile`] cast to the opaque C handle type; `close` reclaims it.

use crate::abi::{self, retro_vfs_file_handle};
use libc::{c_char, c_int, c_uint, c_void};
use std::ffi::{CStr, CString};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use tracing::trace;

struct VfsFile {
    file: File,
    path: CString,
}

static INTERFACE: abi::retro_vfs_interface = abi::retro_vfs_interface {
    get_path: vfs_get_path,
    open: vfs_open,
    close: vfs_close,
    size: vfs_size,
    tell: vfs_tell,
    seek: vfs_seek,
    read: vfs_read,
    write: vfs_write,
    flush: vfs_flush,
    remove: vfs_remove,
    rename: vfs_rename,
    truncate: vfs_truncate,
};

/// The interface table returned through `GET_VFS_INTERFACE`
pub(crate) fn interface() -> *const abi::retro_vfs_interface {
    &INTERFACE
}

fn guarded<T>(fallback: T, f: impl FnOnce() -> T) -> T {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or(fallback)
}

unsafe fn handle<'a>(stream: *mut retro_vfs_file_handle) -> Option<&'a mut VfsFile> {
    (stream as *mut VfsFile).as_mut()
}

unsafe fn path_arg<'a>(path: *const c_char) -> Option<&'a str> {
    if path.is_null() {
        return None;
    }
    CStr::from_ptr(path).to_str().ok()
}

unsafe extern "C" fn vfs_get_path(stream: *mut retro_vfs_file_handle) -> *const c_char {
    guarded(ptr::null(), || match handle(stream) {
        Some(vfs) => vfs.path.as_ptr(),
        None => ptr::null(),
    })
}

unsafe extern "C" fn vfs_open(
    path: *const c_char,
    mode: c_uint,
    _hints: c_uint,
) -> *mut retro_vfs_file_handle {
    guarded(ptr::null_mut(), || {
        let Some(path) = path_arg(path) else {
            return ptr::null_mut();
        };

        let read = mode & abi::RETRO_VFS_FILE_ACCESS_READ != 0;
        let write = mode & abi::RETRO_VFS_FILE_ACCESS_WRITE != 0;
        let update = mode & abi::RETRO_VFS_FILE_ACCESS_UPDATE_EXISTING != 0;

        let mut options = OpenOptions::new();
        options
            .read(read || (write && update))
            .write(write)
            .create(write && !update)
            .truncate(write && !update);

        match (options.open(path), CString::new(path)) {
            (Ok(file), Ok(c_path)) => {
                trace!("VFS open {} (mode {:#x})", path, mode);
                Box::into_raw(Box::new(VfsFile { file, path: c_path })) as *mut retro_vfs_file_handle
            }
            _ => ptr::null_mut(),
        }
    })
}

unsafe extern "C" fn vfs_close(stream: *mut retro_vfs_file_handle) -> c_int {
    guarded(-1, || {
        if stream.is_null() {
            return -1;
        }
        drop(Box::from_raw(stream as *mut VfsFile));
        0
    })
}

unsafe extern "C" fn vfs_size(stream: *mut retro_vfs_file_handle) -> i64 {
    guarded(-1, || {
        handle(stream)
            .and_then(|vfs| vfs.file.metadata().ok())
            .map_or(-1, |meta| meta.len() as i64)
    })
}

unsafe extern "C" fn vfs_tell(stream: *mut retro_vfs_file_handle) -> i64 {
    guarded(-1, || {
        handle(stream)
            .and_then(|vfs| vfs.file.stream_position().ok())
            .map_or(-1, |pos| pos as i64)
    })
}

unsafe extern "C" fn vfs_seek(
    stream: *mut retro_vfs_file_handle,
    offset: i64,
    seek_position: c_int,
) -> i64 {
    guarded(-1, || {
        let Some(vfs) = handle(stream) else {
            return -1;
        };
        let target = match seek_position {
            abi::RETRO_VFS_SEEK_POSITION_START if offset >= 0 => SeekFrom::Start(offset as u64),
            abi::RETRO_VFS_SEEK_POSITION_CURRENT => SeekFrom::Current(offset),
            abi::RETRO_VFS_SEEK_POSITION_END => SeekFrom::End(offset),
            _ => return -1,
        };
        vfs.file.seek(target).map_or(-1, |pos| pos as i64)
    })
}

unsafe extern "C" fn vfs_read(stream: *mut retro_vfs_file_handle, s: *mut c_void, len: u64) -> i64 {
    guarded(-1, || {
        let Some(vfs) = handle(stream) else {
            return -1;
        };
        if len == 0 {
            return 0;
        }
        if s.is_null() {
            return -1;
        }
        let buf = std::slice::from_raw_parts_mut(s as *mut u8, len as usize);
        let mut filled = 0;
        while filled < buf.len() {
            match vfs.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => return -1,
            }
        }
        filled as i64
    })
}

unsafe extern "C" fn vfs_write(stream: *mut retro_vfs_file_handle, s: *const c_void, len: u64) -> i64 {
    guarded(-1, || {
        let Some(vfs) = handle(stream) else {
            return -1;
        };
        if len == 0 {
            return 0;
        }
        if s.is_null() {
            return -1;
        }
        let buf = std::slice::from_raw_parts(s as *const u8, len as usize);
        vfs.file.write_all(buf).map_or(-1, |_| len as i64)
    })
}

unsafe extern "C" fn vfs_flush(stream: *mut retro_vfs_file_handle) -> c_int {
    guarded(-1, || match handle(stream) {
        Some(vfs) => vfs.file.flush().map_or(-1, |_| 0),
        None => -1,
    })
}

unsafe extern "C" fn vfs_remove(path: *const c_char) -> c_int {
    guarded(-1, || match path_arg(path) {
        Some(path) => fs::remove_file(path).map_or(-1, |_| 0),
        None => -1,
    })
}

unsafe extern "C" fn vfs_rename(old_path: *const c_char, new_path: *const c_char) -> c_int {
    guarded(-1, || match (path_arg(old_path), path_arg(new_path)) {
        (Some(from), Some(to)) => fs::rename(from, to).map_or(-1, |_| 0),
        _ => -1,
    })
}

unsafe extern "C" fn vfs_truncate(stream: *mut retro_vfs_file_handle, length: i64) -> i64 {
    guarded(-1, || match handle(stream) {
        Some(vfs) if length >= 0 => vfs.file.set_len(length as u64).map_or(-1, |_| 0),
        _ => -1,
    })
}
