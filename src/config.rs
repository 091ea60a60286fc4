//! Centralized configuration for silhouette.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - StoreConfig::from_env() reads SIL_* variables; fluent with_* setters
//!   override individual fields.
//!
//! Hash policy:
//! - hash = None means "adopt the snapshot manifest's algorithm when
//!   reading, default to md5 otherwise". Setting a hash explicitly forces
//!   it; opening a snapshot built with a different algorithm then fails.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::consts::{DEFAULT_CHUNK_SIZE, DEFAULT_IMAGE_SIZE_MB};
use crate::errors::{Error, Result};
use crate::hasher::{HashStrategy, Md5Strategy, Sha256Strategy};

/// Digest algorithm for snapshot records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HashAlgo {
    #[default]
    Md5,
    Sha256,
}

impl HashAlgo {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "md5" => Some(HashAlgo::Md5),
            "sha256" => Some(HashAlgo::Sha256),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HashAlgo::Md5 => "md5",
            HashAlgo::Sha256 => "sha256",
        }
    }

    pub fn strategy(self) -> Arc<dyn HashStrategy> {
        match self {
            HashAlgo::Md5 => Arc::new(Md5Strategy),
            HashAlgo::Sha256 => Arc::new(Sha256Strategy),
        }
    }
}

impl FromStr for HashAlgo {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
            .ok_or_else(|| Error::invalid(format!("unknown hash '{}' (md5|sha256)", s)))
    }
}

impl fmt::Display for HashAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which mount backend serves the snapshot root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// The store identifier is itself a directory (no privileges needed).
    #[default]
    Dir,
    /// Loopback-mounted ext4 image (requires mount privileges).
    Ext4,
}

impl BackendKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dir" => Some(BackendKind::Dir),
            "ext4" => Some(BackendKind::Ext4),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Dir => "dir",
            BackendKind::Ext4 => "ext4",
        }
    }
}

impl FromStr for BackendKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
            .ok_or_else(|| Error::invalid(format!("unknown backend '{}' (dir|ext4)", s)))
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Top-level configuration for a snapshot store.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Digest algorithm; None = adopt manifest (read) / md5 (write).
    /// Env: SIL_HASH = md5|sha256
    pub hash: Option<HashAlgo>,

    /// Streaming read size for hashing and byte comparison.
    /// Env: SIL_CHUNK_SIZE (bytes, default 65536, must be > 0)
    pub chunk_size: usize,

    /// Mount backend kind.
    /// Env: SIL_BACKEND = dir|ext4 (default dir)
    pub backend: BackendKind,

    /// Fixed mount point for image backends; None = fresh temp dir.
    /// Env: SIL_MOUNT_POINT
    pub mount_point: Option<PathBuf>,

    /// Backing image size on creation, MiB.
    /// Env: SIL_IMAGE_SIZE_MB (default 10)
    pub image_size_mb: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            hash: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            backend: BackendKind::Dir,
            mount_point: None,
            image_size_mb: DEFAULT_IMAGE_SIZE_MB,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables. Unparsable values
    /// keep the defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("SIL_HASH") {
            if let Some(algo) = HashAlgo::from_name(&v) {
                cfg.hash = Some(algo);
            }
        }

        if let Ok(v) = std::env::var("SIL_CHUNK_SIZE") {
            if let Ok(n) = v.trim().parse::<usize>() {
                if n > 0 {
                    cfg.chunk_size = n;
                }
            }
        }

        if let Ok(v) = std::env::var("SIL_BACKEND") {
            if let Some(kind) = BackendKind::from_name(&v) {
                cfg.backend = kind;
            }
        }

        if let Ok(v) = std::env::var("SIL_MOUNT_POINT") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.mount_point = Some(PathBuf::from(s));
            }
        }

        if let Ok(v) = std::env::var("SIL_IMAGE_SIZE_MB") {
            if let Ok(n) = v.trim().parse::<u64>() {
                if n > 0 {
                    cfg.image_size_mb = n;
                }
            }
        }

        cfg
    }

    /// Fluent setters (builder-style) to override specific fields.

    pub fn with_hash(mut self, hash: Option<HashAlgo>) -> Self {
        self.hash = hash;
        self
    }

    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    pub fn with_backend(mut self, kind: BackendKind) -> Self {
        self.backend = kind;
        self
    }

    pub fn with_mount_point<P: Into<PathBuf>>(mut self, mp: Option<P>) -> Self {
        self.mount_point = mp.map(Into::into);
        self
    }

    pub fn with_image_size_mb(mut self, mb: u64) -> Self {
        self.image_size_mb = mb;
        self
    }
}

impl fmt::Display for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StoreConfig {{ hash: {}, chunk_size: {}, backend: {}, mount_point: {}, image_size_mb: {} }}",
            self.hash
                .map(|h| h.name().to_string())
                .unwrap_or_else(|| "default(manifest/md5)".to_string()),
            self.chunk_size,
            self.backend,
            self.mount_point
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "default(tempdir)".to_string()),
            self.image_size_mb,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chain_overrides() {
        let cfg = StoreConfig::default()
            .with_hash(Some(HashAlgo::Sha256))
            .with_chunk_size(4096)
            .with_backend(BackendKind::Ext4)
            .with_mount_point(Some("/mnt/snap"))
            .with_image_size_mb(64);
        assert_eq!(cfg.hash, Some(HashAlgo::Sha256));
        assert_eq!(cfg.chunk_size, 4096);
        assert_eq!(cfg.backend, BackendKind::Ext4);
        assert_eq!(cfg.mount_point.as_deref(), Some(std::path::Path::new("/mnt/snap")));
        assert_eq!(cfg.image_size_mb, 64);
    }

    #[test]
    fn hash_algo_names() {
        assert_eq!(HashAlgo::from_name("MD5"), Some(HashAlgo::Md5));
        assert_eq!(HashAlgo::from_name("sha256"), Some(HashAlgo::Sha256));
        assert_eq!(HashAlgo::from_name("crc32"), None);
        assert!("blake3".parse::<HashAlgo>().is_err());
    }
}
