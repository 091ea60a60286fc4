//! manifest — самоописание снапшота (<root>/.silhouette.json).
//!
//! Фиксирует идентичность digest-алгоритма на момент сборки: имя, ширину
//! digest'а и порог записи. Сравнение снапшота другим алгоритмом даёт
//! бессмысленные ответы, поэтому открытие на чтение сверяется с манифестом.
//!
//! Политика:
//! - Сериализация serde_json (pretty), запись tmp+rename + fsync каталога.
//! - Содержимое детерминировано (без таймстампов): повторная сборка
//!   неизменного источника даёт байт-в-байт идентичное дерево.
//! - Отсутствие манифеста допустимо (снапшот старого формата).

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::HashAlgo;
use crate::consts::{MANIFEST_FILE, MANIFEST_VERSION};
use crate::errors::{Error, Result};
use crate::record::RecordCodec;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub format_version: u32, // == 1
    pub hash: String,        // "md5" | "sha256"
    pub digest_len: usize,
    pub threshold: u64, // 8 + digest_len
}

impl SnapshotManifest {
    pub fn for_codec(codec: &RecordCodec) -> Self {
        Self {
            format_version: MANIFEST_VERSION,
            hash: codec.strategy().name().to_string(),
            digest_len: codec.strategy().digest_len(),
            threshold: codec.threshold(),
        }
    }

    pub fn path_in(root: &Path) -> PathBuf {
        root.join(MANIFEST_FILE)
    }

    /// Записать манифест атомарно (tmp+rename).
    pub fn write(&self, root: &Path) -> Result<()> {
        let path = Self::path_in(root);
        let tmp = root.join(format!("{}.tmp", MANIFEST_FILE));
        let _ = fs::remove_file(&tmp); // best-effort

        let body = serde_json::to_vec_pretty(self)
            .map_err(|e| Error::invalid(format!("encode snapshot manifest: {}", e)))?;

        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)?;
        f.write_all(&body)?;
        f.sync_all()?;

        fs::rename(&tmp, &path)?;
        let _ = fsync_dir(&path);
        Ok(())
    }

    /// Прочитать манифест; None, если файла нет.
    pub fn read(root: &Path) -> Result<Option<Self>> {
        let path = Self::path_in(root);
        let mut f = match OpenOptions::new().read(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut body = String::new();
        f.read_to_string(&mut body)?;
        let m: SnapshotManifest = serde_json::from_str(&body).map_err(|e| {
            Error::invalid(format!(
                "snapshot manifest {} is corrupt: {}",
                path.display(),
                e
            ))
        })?;
        if m.format_version != MANIFEST_VERSION {
            return Err(Error::invalid(format!(
                "unsupported manifest version {} at {} (expected {})",
                m.format_version,
                path.display(),
                MANIFEST_VERSION
            )));
        }
        Ok(Some(m))
    }

    /// Выбрать алгоритм digest'а для чтения снапшота: манифест главнее;
    /// явно заданный алгоритм сверяется с ним. Без манифеста — заданный
    /// алгоритм или md5.
    pub fn resolve_algo(root: &Path, forced: Option<HashAlgo>) -> Result<HashAlgo> {
        match Self::read(root)? {
            Some(m) => {
                let algo = HashAlgo::from_name(&m.hash).ok_or_else(|| {
                    Error::invalid(format!("snapshot uses unsupported hash '{}'", m.hash))
                })?;
                // Внутренняя согласованность digest_len/threshold.
                m.ensure_matches(&RecordCodec::new(algo.strategy()))?;
                if let Some(want) = forced {
                    if want != algo {
                        return Err(Error::invalid(format!(
                            "snapshot was built with {}, store is configured for {}",
                            algo, want
                        )));
                    }
                }
                Ok(algo)
            }
            None => {
                debug!(
                    "manifest: none at {}, assuming {}",
                    root.display(),
                    forced.unwrap_or_default()
                );
                Ok(forced.unwrap_or_default())
            }
        }
    }

    /// Сверить манифест с кодеком, которым собираемся сравнивать.
    pub fn ensure_matches(&self, codec: &RecordCodec) -> Result<()> {
        let strategy = codec.strategy();
        if self.hash != strategy.name()
            || self.digest_len != strategy.digest_len()
            || self.threshold != codec.threshold()
        {
            return Err(Error::invalid(format!(
                "snapshot was built with {} ({}-byte digest, threshold {}), \
                 store is configured for {} ({}-byte digest, threshold {})",
                self.hash,
                self.digest_len,
                self.threshold,
                strategy.name(),
                strategy.digest_len(),
                codec.threshold()
            )));
        }
        Ok(())
    }
}

fn fsync_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            let dir = File::open(parent)?;
            dir.sync_all()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::{Md5Strategy, Sha256Strategy};
    use std::sync::Arc;

    fn nanos_for_test() -> u128 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    }

    #[test]
    fn manifest_roundtrip() {
        let root = std::env::temp_dir().join(format!("silhouette_manifest_{}", nanos_for_test()));
        fs::create_dir_all(&root).unwrap();

        let codec = RecordCodec::new(Arc::new(Md5Strategy));
        assert!(SnapshotManifest::read(&root).unwrap().is_none());

        SnapshotManifest::for_codec(&codec).write(&root).unwrap();
        let m = SnapshotManifest::read(&root).unwrap().unwrap();
        assert_eq!(m.format_version, MANIFEST_VERSION);
        assert_eq!(m.hash, "md5");
        assert_eq!(m.digest_len, 16);
        assert_eq!(m.threshold, 24);
        m.ensure_matches(&codec).unwrap();

        let sha = RecordCodec::new(Arc::new(Sha256Strategy));
        assert!(m.ensure_matches(&sha).is_err());

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn deterministic_bytes() {
        let codec = RecordCodec::new(Arc::new(Md5Strategy));
        let a = serde_json::to_vec_pretty(&SnapshotManifest::for_codec(&codec)).unwrap();
        let b = serde_json::to_vec_pretty(&SnapshotManifest::for_codec(&codec)).unwrap();
        assert_eq!(a, b);
    }
}
