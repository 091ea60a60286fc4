//! Error kinds for the silhouette library.
//!
//! Three caller-visible failure classes plus plain I/O:
//! - Backend: the mount service could not provide/release the snapshot root
//!   (diagnostic text from the underlying tool is preserved in `reason`).
//! - InvalidArgument: caller misuse (bad pattern, wrong mode, path escaping
//!   the snapshot root, missing live file).
//! - Build: a snapshot build aborted; destination contents are not a valid
//!   snapshot. Carries the path that failed.
//!
//! Content mismatches are never errors: compare returns Ok(false).

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("backend: {reason}")]
    Backend { reason: String },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("snapshot build failed at '{}': {source}", path.display())]
    Build {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn backend(reason: impl Into<String>) -> Self {
        Error::Backend {
            reason: reason.into(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn build(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Build {
            path: path.into(),
            source,
        }
    }
}
