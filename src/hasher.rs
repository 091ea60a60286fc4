//! hasher — injectable digest strategies for snapshot records.
//!
//! One trait pair: HashStrategy (identity + factory) and HashState
//! (streaming digest in progress). Built-in strategies:
//! - Md5Strategy    — 16-byte digest, the default record digest.
//! - Sha256Strategy — 32-byte digest.
//!
//! All file hashing goes through digest_file(), which reads in bounded
//! chunks. Whole-file buffering is not an option here: snapshot sources
//! routinely contain files far larger than memory.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use md5::{Digest, Md5};
use sha2::Sha256;

/// Identity and factory for a digest algorithm. Thread-safe.
pub trait HashStrategy: Send + Sync {
    /// Stable lowercase name, persisted in the snapshot manifest.
    fn name(&self) -> &'static str;
    /// Digest width in bytes (record width = 8 + digest_len).
    fn digest_len(&self) -> usize;
    /// Start a fresh streaming digest.
    fn begin(&self) -> Box<dyn HashState>;
}

/// A digest in progress.
pub trait HashState {
    fn update(&mut self, chunk: &[u8]);
    fn finish(self: Box<Self>) -> Vec<u8>;
}

#[derive(Clone, Debug, Default)]
pub struct Md5Strategy;

struct Md5State(Md5);

impl HashStrategy for Md5Strategy {
    fn name(&self) -> &'static str {
        "md5"
    }
    fn digest_len(&self) -> usize {
        16
    }
    fn begin(&self) -> Box<dyn HashState> {
        Box::new(Md5State(Md5::new()))
    }
}

impl HashState for Md5State {
    fn update(&mut self, chunk: &[u8]) {
        self.0.update(chunk);
    }
    fn finish(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_vec()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Sha256Strategy;

struct Sha256State(Sha256);

impl HashStrategy for Sha256Strategy {
    fn name(&self) -> &'static str {
        "sha256"
    }
    fn digest_len(&self) -> usize {
        32
    }
    fn begin(&self) -> Box<dyn HashState> {
        Box::new(Sha256State(Sha256::new()))
    }
}

impl HashState for Sha256State {
    fn update(&mut self, chunk: &[u8]) {
        self.0.update(chunk);
    }
    fn finish(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_vec()
    }
}

/// Digest a whole file, reading at most chunk_size bytes at a time.
pub fn digest_file(
    strategy: &Arc<dyn HashStrategy>,
    path: &Path,
    chunk_size: usize,
) -> io::Result<Vec<u8>> {
    let mut f = File::open(path)?;
    let mut state = strategy.begin();
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        match f.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => state.update(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(state.finish())
}
