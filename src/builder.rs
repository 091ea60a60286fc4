//! builder — сборка снапшота: зеркало дерева с записями вместо крупных файлов.
//!
//! Правила зеркалирования (lstat-типизация, symlink'и не разыменовываются):
//! - каталог  -> реальный каталог + mode/owner;
//! - symlink  -> symlink с тем же target (байт в байт) + owner (lchown);
//! - файл < threshold  -> копия байт в байт + mode/owner/times;
//! - файл >= threshold -> запись кодека (size+digest) + mode/owner/times.
//! Спецфайлы (fifo/socket/device) в снапшот не попадают.
//!
//! Фильтр применяется к каждому элементу по относительному пути; запрещённый
//! каталог отсекает всё поддерево до каких-либо stat/hash работ под ним.
//! Digest крупных файлов считается потоково, ограниченными чанками.
//!
//! Любая ошибка прерывает сборку целиком: частично записанное назначение
//! валидным снапшотом не является. Манифест пишется последним.

use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::StoreConfig;
use crate::consts::MANIFEST_FILE;
use crate::errors::{Error, Result};
use crate::filter::TreeFilter;
use crate::fsx;
use crate::hasher::{digest_file, HashStrategy};
use crate::manifest::SnapshotManifest;
use crate::metrics::{
    record_dir_mirrored, record_entry_filtered, record_file_copied, record_file_recorded,
    record_symlink_mirrored,
};
use crate::record::RecordCodec;

pub struct SnapshotBuilder {
    codec: RecordCodec,
    chunk_size: usize,
}

impl SnapshotBuilder {
    pub fn new(cfg: &StoreConfig) -> Result<Self> {
        if cfg.chunk_size == 0 {
            return Err(Error::invalid("chunk_size must be > 0"));
        }
        Ok(Self::from_parts(
            cfg.hash.unwrap_or_default().strategy(),
            cfg.chunk_size,
        ))
    }

    pub fn from_parts(strategy: std::sync::Arc<dyn HashStrategy>, chunk_size: usize) -> Self {
        Self {
            codec: RecordCodec::new(strategy),
            chunk_size,
        }
    }

    /// Построить снапшот src -> dst. dst должен существовать (смонтированный
    /// корень); его содержимое дополняется, очистка — забота Store::save.
    pub fn build(&self, src: &Path, dst: &Path, filter: &TreeFilter) -> Result<()> {
        let src_meta = fs::metadata(src).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::invalid(format!("source directory does not exist: {}", src.display()))
            } else {
                Error::build(src, e)
            }
        })?;
        if !src_meta.is_dir() {
            return Err(Error::invalid(format!(
                "source is not a directory: {}",
                src.display()
            )));
        }
        if !dst.is_dir() {
            return Err(Error::invalid(format!(
                "destination root is not a directory: {}",
                dst.display()
            )));
        }

        let threshold = self.codec.threshold();
        info!(
            "snapshot build: start, src={}, dst={}, hash={}, threshold={}",
            src.display(),
            dst.display(),
            self.codec.strategy().name(),
            threshold
        );

        let mut dirs: u64 = 0;
        let mut files_copied: u64 = 0;
        let mut files_recorded: u64 = 0;
        let mut symlinks: u64 = 0;

        // Отсортированный обход даёт детерминированные снапшоты; filter_entry
        // отсекает запрещённые каталоги до спуска в них.
        let walker = WalkDir::new(src)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let rel = match e.path().strip_prefix(src) {
                    Ok(r) => r,
                    Err(_) => return true,
                };
                if filter.allows(rel) {
                    true
                } else {
                    debug!("build: filtered out {}", rel.display());
                    record_entry_filtered();
                    false
                }
            });

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| src.to_path_buf());
                let io_err = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "walk error"));
                Error::build(path, io_err)
            })?;

            let rel = entry
                .path()
                .strip_prefix(src)
                .map_err(|_| {
                    Error::invalid(format!("entry escaped walk root: {}", entry.path().display()))
                })?
                .to_path_buf();

            if entry.depth() == 1 && entry.file_name() == OsStr::new(MANIFEST_FILE) {
                warn!("build: skipping reserved top-level name {}", MANIFEST_FILE);
                continue;
            }

            let out = dst.join(&rel);
            let ft = entry.file_type();
            if ft.is_dir() {
                self.mirror_dir(entry.path(), &out)?;
                dirs += 1;
            } else if ft.is_symlink() {
                self.mirror_symlink(entry.path(), &out)?;
                symlinks += 1;
            } else if ft.is_file() {
                let meta =
                    fs::symlink_metadata(entry.path()).map_err(|e| Error::build(entry.path(), e))?;
                if meta.len() < threshold {
                    self.copy_small(entry.path(), &meta, &out)?;
                    files_copied += 1;
                } else {
                    self.write_record(entry.path(), &meta, &out)?;
                    files_recorded += 1;
                }
            } else {
                warn!("build: skipping special file {}", rel.display());
            }
        }

        // Манифест последним: его наличие означает завершённую сборку.
        SnapshotManifest::for_codec(&self.codec).write(dst)?;

        info!(
            "snapshot build: done, dirs={}, files_copied={}, files_recorded={}, symlinks={}",
            dirs, files_copied, files_recorded, symlinks
        );
        Ok(())
    }

    fn mirror_dir(&self, src: &Path, out: &Path) -> Result<()> {
        let ctx = |e: io::Error| Error::build(src, e);
        let meta = fs::symlink_metadata(src).map_err(ctx)?;
        fs::create_dir(out).map_err(ctx)?;
        fsx::copy_mode(&meta, out).map_err(ctx)?;
        fsx::copy_owner(&meta, out).map_err(ctx)?;
        record_dir_mirrored();
        Ok(())
    }

    fn mirror_symlink(&self, src: &Path, out: &Path) -> Result<()> {
        let ctx = |e: io::Error| Error::build(src, e);
        let meta = fs::symlink_metadata(src).map_err(ctx)?;
        let target = fs::read_link(src).map_err(ctx)?;
        std::os::unix::fs::symlink(&target, out).map_err(ctx)?;
        fsx::copy_owner_nofollow(&meta, out).map_err(ctx)?;
        record_symlink_mirrored();
        Ok(())
    }

    fn copy_small(&self, src: &Path, meta: &fs::Metadata, out: &Path) -> Result<()> {
        let ctx = |e: io::Error| Error::build(src, e);
        // fs::copy переносит содержимое и permission bits.
        fs::copy(src, out).map_err(ctx)?;
        fsx::copy_owner(meta, out).map_err(ctx)?;
        fsx::copy_times(meta, out).map_err(ctx)?;
        record_file_copied(meta.len());
        Ok(())
    }

    fn write_record(&self, src: &Path, meta: &fs::Metadata, out: &Path) -> Result<()> {
        let ctx = |e: io::Error| Error::build(src, e);
        let digest = digest_file(self.codec.strategy(), src, self.chunk_size).map_err(ctx)?;
        let bytes = self.codec.encode(meta.len(), &digest)?;
        {
            let mut f = File::create(out).map_err(ctx)?;
            f.write_all(&bytes).map_err(ctx)?;
        }
        fsx::copy_mode(meta, out).map_err(ctx)?;
        fsx::copy_owner(meta, out).map_err(ctx)?;
        // times последними: запись содержимого обновила бы mtime
        fsx::copy_times(meta, out).map_err(ctx)?;
        record_file_recorded(meta.len());
        Ok(())
    }
}

/// Собрать снапшот в обычный каталог, минуя Store (конфиг из ENV).
/// Каталог назначения создаётся при необходимости; существующее содержимое
/// не очищается.
pub fn build_snapshot<S: AsRef<str>>(
    src: &Path,
    dst: &Path,
    include: &[S],
    exclude: &[S],
) -> Result<()> {
    let cfg = StoreConfig::from_env();
    let filter = TreeFilter::new(include, exclude)?;
    let builder = SnapshotBuilder::new(&cfg)?;
    fs::create_dir_all(dst)?;
    builder.build(src, dst, &filter)
}
