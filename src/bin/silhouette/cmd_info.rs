use anyhow::Result;
use serde_json::json;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use walkdir::WalkDir;

use silhouette::consts::MANIFEST_FILE;
use silhouette::{AccessMode, Store};

use crate::util;

struct Summary {
    hash: String,
    digest_len: usize,
    threshold: u64,
    from_manifest: bool,
    dirs: u64,
    small_files: u64,
    records: u64,
    symlinks: u64,
    oversized: u64,
    // Сколько занято в сторе и сколько байт живого дерева это представляет.
    stored_bytes: u64,
    represented_bytes: u64,
}

pub fn exec(
    store: PathBuf,
    backend: Option<String>,
    mount_point: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let cfg = util::store_config(None, backend, None, mount_point, None)?;
    let st = Store::open_with_config(&store, AccessMode::ReadOnly, cfg)?;
    let res = summarize(&st);
    st.close()?;
    let s = res?;

    if json {
        let doc = json!({
            "store": store.display().to_string(),
            "hash": s.hash,
            "digest_len": s.digest_len,
            "threshold": s.threshold,
            "manifest": s.from_manifest,
            "dirs": s.dirs,
            "small_files": s.small_files,
            "records": s.records,
            "symlinks": s.symlinks,
            "oversized": s.oversized,
            "stored_bytes": s.stored_bytes,
            "represented_bytes": s.represented_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        println!("Snapshot store '{}'", store.display());
        let origin = if s.from_manifest { "" } else { " [no manifest, assumed]" };
        println!("  hash        = {} ({}-byte digest){}", s.hash, s.digest_len, origin);
        println!("  threshold   = {} bytes", s.threshold);
        println!("  dirs        = {}", s.dirs);
        println!("  small files = {}", s.small_files);
        println!("  records     = {}", s.records);
        println!("  symlinks    = {}", s.symlinks);
        if s.oversized > 0 {
            println!("  OVERSIZED   = {} (larger than the record threshold)", s.oversized);
        }
        println!(
            "  stored      = {} bytes, represents {} bytes of live data",
            s.stored_bytes, s.represented_bytes
        );
    }
    Ok(())
}

fn summarize(st: &Store) -> Result<Summary> {
    let root = st.getdir()?.to_path_buf();
    let codec = st.codec().clone();
    let threshold = codec.threshold();
    let (hash, digest_len, from_manifest) = match st.manifest() {
        Some(m) => (m.hash.clone(), m.digest_len, true),
        None => (
            codec.strategy().name().to_string(),
            codec.strategy().digest_len(),
            false,
        ),
    };

    let mut s = Summary {
        hash,
        digest_len,
        threshold,
        from_manifest,
        dirs: 0,
        small_files: 0,
        records: 0,
        symlinks: 0,
        oversized: 0,
        stored_bytes: 0,
        represented_bytes: 0,
    };

    for entry in WalkDir::new(&root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.depth() == 1 && entry.file_name() == OsStr::new(MANIFEST_FILE) {
            continue;
        }
        let ft = entry.file_type();
        if ft.is_dir() {
            s.dirs += 1;
        } else if ft.is_symlink() {
            s.symlinks += 1;
        } else if ft.is_file() {
            let len = entry.metadata()?.len();
            if len < threshold {
                s.small_files += 1;
                s.stored_bytes += len;
                s.represented_bytes += len;
            } else if len == threshold {
                let rec = codec.decode(&fs::read(entry.path())?)?;
                s.records += 1;
                s.stored_bytes += len;
                s.represented_bytes += rec.size;
            } else {
                s.oversized += 1;
            }
        }
    }
    Ok(s)
}
