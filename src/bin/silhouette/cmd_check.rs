use anyhow::Result;
use log::debug;
use serde_json::json;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use silhouette::consts::MANIFEST_FILE;
use silhouette::{AccessMode, Store, TreeFilter};

use crate::util;

struct Report {
    compared: u64,
    mismatched: Vec<PathBuf>,
    missing_stored: Vec<PathBuf>,
    missing_live: Vec<PathBuf>,
}

impl Report {
    fn dirty(&self) -> bool {
        !self.mismatched.is_empty()
            || !self.missing_stored.is_empty()
            || !self.missing_live.is_empty()
    }
}

pub fn exec(
    src: PathBuf,
    store: PathBuf,
    include: Vec<String>,
    exclude: Vec<String>,
    hash: Option<String>,
    backend: Option<String>,
    mount_point: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let cfg = util::store_config(hash, backend, None, mount_point, None)?;
    let filter = TreeFilter::new(&include, &exclude)?;

    let st = Store::open_with_config(&store, AccessMode::ReadOnly, cfg)?;
    let res = check_tree(&st, &src, &filter);
    st.close()?;
    let rep = res?;

    if json {
        let paths = |v: &[PathBuf]| -> Vec<String> {
            v.iter().map(|p| p.display().to_string()).collect()
        };
        let doc = json!({
            "src": src.display().to_string(),
            "store": store.display().to_string(),
            "compared": rep.compared,
            "mismatched": paths(&rep.mismatched),
            "missing_stored": paths(&rep.missing_stored),
            "missing_live": paths(&rep.missing_live),
            "clean": !rep.dirty(),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        for p in &rep.mismatched {
            println!("MISMATCH '{}'", p.display());
        }
        for p in &rep.missing_stored {
            println!("MISSING in store: '{}'", p.display());
        }
        for p in &rep.missing_live {
            println!("GONE from live tree: '{}'", p.display());
        }
        println!(
            "checked {} file(s): {} mismatched, {} missing in store, {} gone from live tree",
            rep.compared,
            rep.mismatched.len(),
            rep.missing_stored.len(),
            rep.missing_live.len()
        );
    }
    if rep.dirty() {
        std::process::exit(1);
    }
    Ok(())
}

fn check_tree(st: &Store, src: &Path, filter: &TreeFilter) -> Result<Report> {
    let root = st.getdir()?.to_path_buf();
    let mut rep = Report {
        compared: 0,
        mismatched: Vec::new(),
        missing_stored: Vec::new(),
        missing_live: Vec::new(),
    };

    // Прямой проход: живое дерево против стора.
    let walker = WalkDir::new(src)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| match e.path().strip_prefix(src) {
            Ok(rel) => filter.allows(rel),
            Err(_) => true,
        });
    for entry in walker {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src)?.to_path_buf();
        if entry.file_type().is_dir() {
            // Каталоги сверяем только по наличию.
            match fs::symlink_metadata(root.join(&rel)) {
                Ok(m) if m.is_dir() => {}
                _ => rep.missing_stored.push(rel),
            }
        } else {
            if fs::symlink_metadata(root.join(&rel)).is_err() {
                rep.missing_stored.push(rel);
                continue;
            }
            rep.compared += 1;
            if !st.compare(entry.path(), &rel)? {
                rep.mismatched.push(rel);
            }
        }
    }

    // Обратный проход: что было в сторе, но пропало из живого дерева.
    let walker = WalkDir::new(&root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 1 && e.file_name() == OsStr::new(MANIFEST_FILE) {
                return false;
            }
            match e.path().strip_prefix(&root) {
                Ok(rel) => filter.allows(rel),
                Err(_) => true,
            }
        });
    for entry in walker {
        let entry = entry?;
        let rel = entry.path().strip_prefix(&root)?.to_path_buf();
        if fs::symlink_metadata(src.join(&rel)).is_err() {
            debug!("check: stored entry has no live counterpart: {}", rel.display());
            rep.missing_live.push(rel);
        }
    }

    Ok(rep)
}
