//! fsx — filesystem helpers for snapshot mirroring.
//!
//! Metadata copy (mode/owner/timestamps), bounded-chunk file equality,
//! directory clearing and lexical path normalization. Owner and timestamp
//! copies go through libc (chown/lchown/utimensat); mode goes through
//! std PermissionsExt. Unix-only, as are the mount backends.

use std::ffi::CString;
use std::fs::{self, File};
use std::io::{self, Read};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};

fn cpath(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL byte"))
}

/// Copy permission bits from source metadata onto dst.
pub fn copy_mode(meta: &fs::Metadata, dst: &Path) -> io::Result<()> {
    fs::set_permissions(dst, fs::Permissions::from_mode(meta.mode() & 0o7777))
}

/// Copy uid/gid onto dst (follows symlinks).
pub fn copy_owner(meta: &fs::Metadata, dst: &Path) -> io::Result<()> {
    let c = cpath(dst)?;
    let rc = unsafe { libc::chown(c.as_ptr(), meta.uid(), meta.gid()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Copy uid/gid onto dst itself, without following a symlink.
pub fn copy_owner_nofollow(meta: &fs::Metadata, dst: &Path) -> io::Result<()> {
    let c = cpath(dst)?;
    let rc = unsafe { libc::lchown(c.as_ptr(), meta.uid(), meta.gid()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Copy atime/mtime (with nanoseconds) onto dst. Call after the last write:
/// writing afterwards would bump mtime again.
pub fn copy_times(meta: &fs::Metadata, dst: &Path) -> io::Result<()> {
    let c = cpath(dst)?;
    let times = [
        libc::timespec {
            tv_sec: meta.atime() as libc::time_t,
            tv_nsec: meta.atime_nsec() as libc::c_long,
        },
        libc::timespec {
            tv_sec: meta.mtime() as libc::time_t,
            tv_nsec: meta.mtime_nsec() as libc::c_long,
        },
    ];
    let rc = unsafe { libc::utimensat(libc::AT_FDCWD, c.as_ptr(), times.as_ptr(), 0) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Remove everything inside dir, keeping dir itself.
pub fn clear_dir_contents(dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let ft = entry.file_type()?;
        if ft.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Read until buf is full or EOF; returns bytes read.
pub(crate) fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut n = 0;
    while n < buf.len() {
        match r.read(&mut buf[n..]) {
            Ok(0) => break,
            Ok(k) => n += k,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(n)
}

/// Byte-for-byte file equality, reading both sides in chunk_size steps.
pub fn files_equal(a: &Path, b: &Path, chunk_size: usize) -> io::Result<bool> {
    let mut fa = File::open(a)?;
    let mut fb = File::open(b)?;
    let chunk = chunk_size.max(1);
    let mut ba = vec![0u8; chunk];
    let mut bb = vec![0u8; chunk];
    loop {
        let na = read_full(&mut fa, &mut ba)?;
        let nb = read_full(&mut fb, &mut bb)?;
        if na != nb {
            return Ok(false);
        }
        if na == 0 {
            return Ok(true);
        }
        if ba[..na] != bb[..nb] {
            return Ok(false);
        }
    }
}

/// Lexical normalization: drop `.`, resolve `..` against the path itself.
/// No filesystem access; used for containment checks on paths whose parent
/// does not exist (canonicalize would fail there).
pub fn normalize_lexical(p: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for c in p.components() {
        match c {
            Component::Prefix(_) | Component::RootDir => out.push(c.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // popping past "/" is a no-op, same as realpath
                out.pop();
            }
            Component::Normal(s) => out.push(s),
        }
    }
    out
}
