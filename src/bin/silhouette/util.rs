use anyhow::Result;
use std::path::PathBuf;

use silhouette::{BackendKind, HashAlgo, StoreConfig};

/// Собрать конфиг стора: окружение SIL_* как база, флаги поверх.
pub fn store_config(
    hash: Option<String>,
    backend: Option<String>,
    chunk_size: Option<usize>,
    mount_point: Option<PathBuf>,
    image_size_mb: Option<u64>,
) -> Result<StoreConfig> {
    let mut cfg = StoreConfig::from_env();
    if let Some(name) = hash {
        let algo: HashAlgo = name.parse()?;
        cfg = cfg.with_hash(Some(algo));
    }
    if let Some(name) = backend {
        let kind: BackendKind = name.parse()?;
        cfg = cfg.with_backend(kind);
    }
    if let Some(bytes) = chunk_size {
        cfg = cfg.with_chunk_size(bytes);
    }
    if mount_point.is_some() {
        cfg = cfg.with_mount_point(mount_point);
    }
    if let Some(mb) = image_size_mb {
        cfg = cfg.with_image_size_mb(mb);
    }
    Ok(cfg)
}
