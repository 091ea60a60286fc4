use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI для silhouette: слепки деревьев и проверка дрейфа
#[derive(Parser, Debug)]
#[command(name = "silhouette", version, about = "Tree snapshots as size+digest records")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Build (or rebuild) a snapshot store from a source tree
    Create {
        /// Source directory to snapshot
        #[arg(long)]
        src: PathBuf,
        /// Store root: a directory, or an image path with --backend ext4
        #[arg(long)]
        store: PathBuf,
        /// fnmatch-style include pattern, repeatable (none = include everything)
        #[arg(long)]
        include: Vec<String>,
        /// fnmatch-style exclude pattern, repeatable
        #[arg(long)]
        exclude: Vec<String>,
        /// Digest algorithm: md5 | sha256
        #[arg(long)]
        hash: Option<String>,
        /// Mount backend: dir | ext4
        #[arg(long)]
        backend: Option<String>,
        /// I/O chunk size in bytes for hashing and copying
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Mount point for image-backed stores (default: temp dir)
        #[arg(long)]
        mount_point: Option<PathBuf>,
        /// Image size in MiB when the ext4 image is created from scratch
        #[arg(long)]
        image_size_mb: Option<u64>,
    },
    /// Compare one live file against its stored entry (exit 1 on mismatch)
    Cmp {
        #[arg(long)]
        store: PathBuf,
        /// Live file or symlink to check
        #[arg(long)]
        file: PathBuf,
        /// Entry path inside the snapshot, relative to the store root
        #[arg(long)]
        entry: PathBuf,
        /// Digest override: md5 | sha256 (the store manifest wins if present)
        #[arg(long)]
        hash: Option<String>,
        #[arg(long)]
        backend: Option<String>,
        #[arg(long)]
        mount_point: Option<PathBuf>,
    },
    /// Walk a live tree and report every entry that drifted from the snapshot
    Check {
        /// Live directory to verify
        #[arg(long)]
        src: PathBuf,
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        include: Vec<String>,
        #[arg(long)]
        exclude: Vec<String>,
        #[arg(long)]
        hash: Option<String>,
        #[arg(long)]
        backend: Option<String>,
        #[arg(long)]
        mount_point: Option<PathBuf>,
        /// Print a JSON report instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show snapshot identity and entry counts
    Info {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        backend: Option<String>,
        #[arg(long)]
        mount_point: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}
