//! backend — mount service behind the snapshot root.
//!
//! The store consumes this at its interface only: acquire a root directory
//! for a store identifier and mode, release it when done. Two impls:
//! - DirBackend: the identifier is itself a directory. No privileges, no
//!   teardown; this is what unit tests run against.
//! - Ext4Backend: the identifier is a loopback ext4 image. Created on
//!   first write (zero-filled + mkfs.ext4), mounted ro/rw at a fixed mount
//!   point or a fresh temp dir, unmounted on release. The image file is
//!   held under an fs2 advisory lock (shared for ReadOnly, exclusive
//!   otherwise) for single-writer safety. Tool failures surface their
//!   stderr in the Backend error.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use fs2::FileExt;
use log::{debug, info};
use tempfile::TempDir;

use crate::errors::{Error, Result};
use crate::store::AccessMode;

/// Provides and releases the snapshot root for a store identifier.
pub trait MountBackend {
    /// Acquire the snapshot root. Writing modes create the store if absent;
    /// ReadOnly fails when the store does not exist.
    fn acquire(&mut self, store: &Path, mode: AccessMode) -> Result<PathBuf>;

    /// Release a root previously returned by acquire.
    fn release(&mut self, root: &Path) -> Result<()>;
}

/// Plain-directory backend: the store identifier is the snapshot root.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirBackend;

impl MountBackend for DirBackend {
    fn acquire(&mut self, store: &Path, mode: AccessMode) -> Result<PathBuf> {
        if mode.writes() {
            std::fs::create_dir_all(store).map_err(|e| {
                Error::backend(format!("create store directory {}: {}", store.display(), e))
            })?;
        } else if !store.is_dir() {
            return Err(Error::backend(format!(
                "store directory not found: {}",
                store.display()
            )));
        }
        debug!("dir backend: acquired root={}", store.display());
        Ok(store.to_path_buf())
    }

    fn release(&mut self, _root: &Path) -> Result<()> {
        Ok(())
    }
}

struct ActiveMount {
    root: PathBuf,
    // Held for the lifetime of the mount; unlock on drop.
    _lock: File,
    // Some => temp mount point, removed on drop (after umount).
    _tempdir: Option<TempDir>,
}

/// Loopback ext4 image backend (requires mount privileges).
pub struct Ext4Backend {
    mount_point: Option<PathBuf>,
    image_size_mb: u64,
    active: Option<ActiveMount>,
}

impl Ext4Backend {
    pub fn new(mount_point: Option<PathBuf>, image_size_mb: u64) -> Self {
        Self {
            mount_point,
            image_size_mb,
            active: None,
        }
    }

    fn create_image(&self, store: &Path) -> Result<()> {
        info!(
            "ext4 backend: create image, path={}, size={}MiB",
            store.display(),
            self.image_size_mb
        );
        let mut f = File::create(store)
            .map_err(|e| Error::backend(format!("create image {}: {}", store.display(), e)))?;
        // Заполняем нулями явно, без sparse-дыр.
        let zeros = vec![0u8; 1024 * 1024];
        for _ in 0..self.image_size_mb {
            f.write_all(&zeros)
                .map_err(|e| Error::backend(format!("zero-fill {}: {}", store.display(), e)))?;
        }
        f.sync_all()
            .map_err(|e| Error::backend(format!("sync {}: {}", store.display(), e)))?;
        drop(f);

        run_tool(
            "mkfs.ext4",
            &[
                "-q".as_ref(),
                "-F".as_ref(),
                "-O".as_ref(),
                "^has_journal".as_ref(),
                store.as_os_str(),
            ],
        )
    }

    fn lock_image(&self, store: &Path, mode: AccessMode) -> Result<File> {
        let f = OpenOptions::new()
            .read(true)
            .write(mode.writes())
            .open(store)
            .map_err(|e| Error::backend(format!("open image {}: {}", store.display(), e)))?;
        let locked = if mode.writes() {
            FileExt::try_lock_exclusive(&f)
        } else {
            FileExt::try_lock_shared(&f)
        };
        locked.map_err(|e| {
            Error::backend(format!(
                "image {} is locked by another process: {}",
                store.display(),
                e
            ))
        })?;
        Ok(f)
    }
}

impl MountBackend for Ext4Backend {
    fn acquire(&mut self, store: &Path, mode: AccessMode) -> Result<PathBuf> {
        if self.active.is_some() {
            return Err(Error::invalid("ext4 backend already holds a mount"));
        }

        if !store.exists() {
            if mode.writes() {
                self.create_image(store)?;
            } else {
                return Err(Error::backend(format!(
                    "store image not found: {}",
                    store.display()
                )));
            }
        }

        let lock = self.lock_image(store, mode)?;

        let (root, tempdir) = match &self.mount_point {
            Some(mp) => {
                std::fs::create_dir_all(mp).map_err(|e| {
                    Error::backend(format!("create mount point {}: {}", mp.display(), e))
                })?;
                (mp.clone(), None)
            }
            None => {
                let td = TempDir::with_prefix("silhouette-mnt-")
                    .map_err(|e| Error::backend(format!("create temp mount point: {}", e)))?;
                (td.path().to_path_buf(), Some(td))
            }
        };

        let opts = if mode.writes() { "loop,rw" } else { "loop,ro" };
        run_tool(
            "mount",
            &[
                "-t".as_ref(),
                "ext4".as_ref(),
                "-o".as_ref(),
                opts.as_ref(),
                store.as_os_str(),
                root.as_os_str(),
            ],
        )?;

        info!(
            "ext4 backend: mounted, image={}, root={}, mode={}",
            store.display(),
            root.display(),
            mode
        );
        self.active = Some(ActiveMount {
            root: root.clone(),
            _lock: lock,
            _tempdir: tempdir,
        });
        Ok(root)
    }

    fn release(&mut self, root: &Path) -> Result<()> {
        let active = match self.active.take() {
            Some(a) => a,
            None => return Ok(()),
        };
        if active.root != root {
            self.active = Some(active);
            return Err(Error::invalid(format!(
                "release of unknown root {}",
                root.display()
            )));
        }
        if let Err(e) = run_tool("umount", &[root.as_os_str()]) {
            // Остаёмся владельцем: повторный release сможет доразмонтировать.
            self.active = Some(active);
            return Err(e);
        }
        info!("ext4 backend: unmounted root={}", root.display());
        // Drop order: lock released, then temp mount point removed.
        drop(active);
        Ok(())
    }
}

fn run_tool(program: &str, args: &[&std::ffi::OsStr]) -> Result<()> {
    let out = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| Error::backend(format!("run {}: {}", program, e)))?;
    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        return Err(Error::backend(format!(
            "{} failed ({}): {}",
            program,
            out.status,
            stderr.trim()
        )));
    }
    Ok(())
}
