//! store — высокоуровневый хэндл снапшот-стора поверх mount-бэкенда.
//!
//! Жизненный цикл: open (захват корня у бэкенда) -> getdir/save/compare ->
//! close (освобождение). Drop освобождает best-effort, если close() не
//! вызывали: корень не протекает ни на одном пути выхода, включая ошибку
//! посреди save.
//!
//! Режимы:
//! - ReadOnly  — getdir/compare; save запрещён;
//! - WriteOnly — save; getdir/compare запрещены;
//! - ReadWrite — всё.
//! В читающих режимах алгоритм digest'а берётся из манифеста снапшота
//! (явно заданный в конфиге алгоритм сверяется с ним).

use std::fmt;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::backend::{DirBackend, Ext4Backend, MountBackend};
use crate::builder::SnapshotBuilder;
use crate::compare::Comparator;
use crate::config::{BackendKind, StoreConfig};
use crate::errors::{Error, Result};
use crate::filter::TreeFilter;
use crate::fsx;
use crate::manifest::SnapshotManifest;
use crate::metrics::{record_save, record_store_opened};
use crate::record::RecordCodec;

/// Режим доступа к стора.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn reads(self) -> bool {
        matches!(self, AccessMode::ReadOnly | AccessMode::ReadWrite)
    }

    pub fn writes(self) -> bool {
        matches!(self, AccessMode::WriteOnly | AccessMode::ReadWrite)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccessMode::ReadOnly => "ro",
            AccessMode::WriteOnly => "wo",
            AccessMode::ReadWrite => "rw",
        })
    }
}

pub struct Store {
    root: PathBuf,
    mode: AccessMode,
    cfg: StoreConfig,
    codec: RecordCodec,
    backend: Box<dyn MountBackend>,
    // Comparator существует только в читающих режимах (заодно и гейт).
    cmp: Option<Comparator>,
    manifest: Option<SnapshotManifest>,
    released: bool,
}

impl Store {
    /// Открыть стор с конфигурацией из ENV.
    pub fn open(store: &Path, mode: AccessMode) -> Result<Store> {
        Self::open_with_config(store, mode, StoreConfig::from_env())
    }

    /// Открыть стор; бэкенд выбирается по cfg.backend.
    pub fn open_with_config(store: &Path, mode: AccessMode, cfg: StoreConfig) -> Result<Store> {
        let backend: Box<dyn MountBackend> = match cfg.backend {
            BackendKind::Dir => Box::new(DirBackend),
            BackendKind::Ext4 => Box::new(Ext4Backend::new(
                cfg.mount_point.clone(),
                cfg.image_size_mb,
            )),
        };
        Self::open_with_backend(store, mode, cfg, backend)
    }

    /// Открыть стор с явным бэкендом (точка инъекции для тестов).
    pub fn open_with_backend(
        store: &Path,
        mode: AccessMode,
        cfg: StoreConfig,
        mut backend: Box<dyn MountBackend>,
    ) -> Result<Store> {
        if cfg.chunk_size == 0 {
            return Err(Error::invalid("chunk_size must be > 0"));
        }

        info!(
            "store open: start, store={}, mode={}, backend={}",
            store.display(),
            mode,
            cfg.backend
        );
        let root = backend.acquire(store, mode)?;

        // После захвата корня любая ошибка обязана его освободить.
        let init = (|| -> Result<(RecordCodec, Option<Comparator>, Option<SnapshotManifest>)> {
            let algo = if mode.reads() {
                SnapshotManifest::resolve_algo(&root, cfg.hash)?
            } else {
                cfg.hash.unwrap_or_default()
            };
            let codec = RecordCodec::new(algo.strategy());
            let manifest = if mode.reads() {
                SnapshotManifest::read(&root)?
            } else {
                None
            };
            let cmp = if mode.reads() {
                Some(Comparator::from_parts(
                    algo.strategy(),
                    cfg.chunk_size,
                    &root,
                )?)
            } else {
                None
            };
            Ok((codec, cmp, manifest))
        })();

        let (codec, cmp, manifest) = match init {
            Ok(v) => v,
            Err(e) => {
                if let Err(re) = backend.release(&root) {
                    warn!("store open: release after failed init: {}", re);
                }
                return Err(e);
            }
        };

        record_store_opened();
        info!(
            "store open: done, root={}, hash={}, threshold={}",
            root.display(),
            codec.strategy().name(),
            codec.threshold()
        );
        Ok(Store {
            root,
            mode,
            cfg,
            codec,
            backend,
            cmp,
            manifest,
            released: false,
        })
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Манифест снапшота, если он был на момент открытия (читающие режимы).
    pub fn manifest(&self) -> Option<&SnapshotManifest> {
        self.manifest.as_ref()
    }

    /// Порог записи действующего кодека.
    pub fn threshold(&self) -> u64 {
        self.codec.threshold()
    }

    /// Действующий кодек записей (алгоритм уже согласован с манифестом).
    pub fn codec(&self) -> &RecordCodec {
        &self.codec
    }

    /// Смонтированный корень снапшота. Только в читающих режимах.
    pub fn getdir(&self) -> Result<&Path> {
        if !self.mode.reads() {
            return Err(Error::invalid("getdir: store is write-only (reader-only op)"));
        }
        Ok(&self.root)
    }

    /// Пересобрать содержимое стора из src. Старое содержимое корня
    /// (включая прежний манифест) удаляется целиком.
    pub fn save<S: AsRef<str>>(&mut self, src: &Path, include: &[S], exclude: &[S]) -> Result<()> {
        if !self.mode.writes() {
            return Err(Error::invalid("save: store is read-only (writer-only op)"));
        }
        let filter = TreeFilter::new(include, exclude)?;

        info!(
            "store save: start, src={}, root={}",
            src.display(),
            self.root.display()
        );
        fsx::clear_dir_contents(&self.root)?;

        let builder = SnapshotBuilder::from_parts(
            self.codec.strategy().clone(),
            self.cfg.chunk_size,
        );
        builder.build(src, &self.root, &filter)?;

        if self.mode.reads() {
            self.manifest = SnapshotManifest::read(&self.root)?;
        }
        record_save();
        info!("store save: done, root={}", self.root.display());
        Ok(())
    }

    /// Сравнить живой файл с хранимой записью (путь — от корня снапшота
    /// или абсолютный внутри него). Только в читающих режимах.
    pub fn compare(&self, live: &Path, stored: &Path) -> Result<bool> {
        match &self.cmp {
            Some(cmp) => cmp.compare(live, stored),
            None => Err(Error::invalid(
                "compare: store is write-only (reader-only op)",
            )),
        }
    }

    /// Закрыть стор, освободив корень у бэкенда.
    pub fn close(mut self) -> Result<()> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        info!("store close: root={}", self.root.display());
        self.backend.release(&self.root)?;
        self.released = true;
        Ok(())
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        // Страховка на случай, если close() не вызвали. Ошибки в Drop
        // только логируем.
        if !self.released {
            if let Err(e) = self.release_inner() {
                warn!("store close (drop): {}", e);
            }
        }
    }
}
