//! compare — поэлементное сравнение живого файла с записью снапшота.
//!
//! Контракт:
//! - вопросы о содержимом отвечаются bool'ом (Ok(true/false)), ошибки — только
//!   про неправильное использование или реальный I/O сбой;
//! - живой путь обязан существовать (lstat) и не быть каталогом;
//! - хранимый путь (относительный — от корня снапшота) после резолва обязан
//!   лежать строго внутри корня, иначе InvalidArgument. Резолв канонизирует
//!   родителя и доклеивает последний компонент: сам лист не разыменовывается,
//!   поэтому хранимые symlink'и сравниваются по target-строке.
//!
//! Ветки сравнения по lstat-размеру хранимого файла:
//! - < threshold  — байт в байт ограниченными чанками;
//! - == threshold — декодировать запись, сверить размер (дешёвый reject),
//!   затем потоковый digest живого файла;
//! - > threshold  — повреждённая запись снапшота: warn + false.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use crate::config::StoreConfig;
use crate::errors::{Error, Result};
use crate::fsx;
use crate::hasher::{digest_file, HashStrategy};
use crate::manifest::SnapshotManifest;
use crate::metrics::{record_compare, record_compare_bytes_hashed};
use crate::record::RecordCodec;

pub struct Comparator {
    codec: RecordCodec,
    chunk_size: usize,
    // Канонизированный корень снапшота; все проверки контейнмента — против него.
    root: PathBuf,
}

impl Comparator {
    pub fn new(cfg: &StoreConfig, root: &Path) -> Result<Self> {
        if cfg.chunk_size == 0 {
            return Err(Error::invalid("chunk_size must be > 0"));
        }
        Self::from_parts(cfg.hash.unwrap_or_default().strategy(), cfg.chunk_size, root)
    }

    pub fn from_parts(
        strategy: Arc<dyn HashStrategy>,
        chunk_size: usize,
        root: &Path,
    ) -> Result<Self> {
        let canon = fs::canonicalize(root).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::invalid(format!("snapshot root does not exist: {}", root.display()))
            } else {
                e.into()
            }
        })?;
        Ok(Self {
            codec: RecordCodec::new(strategy),
            chunk_size,
            root: canon,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Сравнить живой файл с хранимой записью. stored может быть относительным
    /// (от корня снапшота) или абсолютным путём внутри корня.
    pub fn compare(&self, live: &Path, stored: &Path) -> Result<bool> {
        let matched = self.compare_inner(live, stored)?;
        record_compare(matched);
        if !matched {
            debug!(
                "compare: mismatch, live={}, stored={}",
                live.display(),
                stored.display()
            );
        }
        Ok(matched)
    }

    fn compare_inner(&self, live: &Path, stored: &Path) -> Result<bool> {
        let live_meta = match fs::symlink_metadata(live) {
            Ok(m) => m,
            Err(e)
                if e.kind() == io::ErrorKind::NotFound
                    || e.kind() == io::ErrorKind::NotADirectory =>
            {
                return Err(Error::invalid(format!(
                    "live file does not exist: {}",
                    live.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };
        if live_meta.is_dir() {
            return Err(Error::invalid(format!(
                "live path is a directory: {}",
                live.display()
            )));
        }

        let stored_abs = if stored.is_absolute() {
            stored.to_path_buf()
        } else {
            self.root.join(stored)
        };
        let resolved = match self.resolve_contained(&stored_abs)? {
            Some(p) => p,
            // Родительского каталога нет — записи нет.
            None => return Ok(false),
        };

        let stored_meta = match fs::symlink_metadata(&resolved) {
            Ok(m) => m,
            Err(e)
                if e.kind() == io::ErrorKind::NotFound
                    || e.kind() == io::ErrorKind::NotADirectory =>
            {
                debug!("compare: stored entry missing: {}", resolved.display());
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };
        if stored_meta.is_dir() {
            debug!("compare: stored entry is a directory: {}", resolved.display());
            return Ok(false);
        }

        let live_is_link = live_meta.file_type().is_symlink();
        let stored_is_link = stored_meta.file_type().is_symlink();
        match (live_is_link, stored_is_link) {
            (true, true) => {
                let a = fs::read_link(live)?;
                let b = fs::read_link(&resolved)?;
                Ok(a == b)
            }
            (false, false) => self.compare_regular(live, &live_meta, &resolved, &stored_meta),
            _ => {
                debug!(
                    "compare: type mismatch (symlink vs file), live={}, stored={}",
                    live.display(),
                    resolved.display()
                );
                Ok(false)
            }
        }
    }

    fn compare_regular(
        &self,
        live: &Path,
        live_meta: &fs::Metadata,
        resolved: &Path,
        stored_meta: &fs::Metadata,
    ) -> Result<bool> {
        let threshold = self.codec.threshold();
        let s_size = stored_meta.len();

        if s_size < threshold {
            // Зеркальная копия: сначала размер, потом байты.
            if live_meta.len() != s_size {
                return Ok(false);
            }
            Ok(fsx::files_equal(live, resolved, self.chunk_size)?)
        } else if s_size == threshold {
            let bytes = fs::read(resolved)?;
            let rec = self.codec.decode(&bytes)?;
            if rec.size != live_meta.len() {
                return Ok(false);
            }
            let digest = digest_file(self.codec.strategy(), live, self.chunk_size)?;
            record_compare_bytes_hashed(live_meta.len());
            Ok(digest == rec.digest)
        } else {
            warn!(
                "compare: stored entry {} is {} bytes, larger than record threshold {} (malformed snapshot entry)",
                resolved.display(),
                s_size,
                threshold
            );
            Ok(false)
        }
    }

    /// Резолв хранимого пути с проверкой контейнмента. None — родителя нет
    /// (контейнмент при этом проверяется лексически).
    fn resolve_contained(&self, p: &Path) -> Result<Option<PathBuf>> {
        let name = p.file_name().ok_or_else(|| {
            Error::invalid(format!("stored path has no file name: {}", p.display()))
        })?;
        let parent = p.parent().ok_or_else(|| {
            Error::invalid(format!("stored path has no parent: {}", p.display()))
        })?;

        let resolved = match fs::canonicalize(parent) {
            Ok(cp) => cp.join(name),
            Err(e)
                if e.kind() == io::ErrorKind::NotFound
                    || e.kind() == io::ErrorKind::NotADirectory =>
            {
                let lex = fsx::normalize_lexical(p);
                self.ensure_contained(&lex)?;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        self.ensure_contained(&resolved)?;
        Ok(Some(resolved))
    }

    fn ensure_contained(&self, resolved: &Path) -> Result<()> {
        // Покомпонентное starts_with: "/snap-evil" не является префиксом "/snap".
        if !resolved.starts_with(&self.root) || resolved == self.root {
            return Err(Error::invalid(format!(
                "stored path escapes snapshot root {}: {}",
                self.root.display(),
                resolved.display()
            )));
        }
        Ok(())
    }
}

/// Сравнить живой файл с записью в каталоге-снапшоте, минуя Store.
/// Алгоритм digest'а берётся из манифеста снапшота (если он есть).
pub fn compare_file(live: &Path, snapshot_root: &Path, stored: &Path) -> Result<bool> {
    let cfg = StoreConfig::from_env();
    let algo = SnapshotManifest::resolve_algo(snapshot_root, cfg.hash)?;
    let cmp = Comparator::from_parts(algo.strategy(), cfg.chunk_size, snapshot_root)?;
    cmp.compare(live, stored)
}
