use anyhow::Result;
use std::path::PathBuf;

use silhouette::{metrics, AccessMode, Store};

use crate::util;

pub fn exec(
    src: PathBuf,
    store: PathBuf,
    include: Vec<String>,
    exclude: Vec<String>,
    hash: Option<String>,
    backend: Option<String>,
    chunk_size: Option<usize>,
    mount_point: Option<PathBuf>,
    image_size_mb: Option<u64>,
) -> Result<()> {
    let cfg = util::store_config(hash, backend, chunk_size, mount_point, image_size_mb)?;
    let mut st = Store::open_with_config(&store, AccessMode::WriteOnly, cfg)?;
    if let Err(e) = st.save(&src, &include, &exclude) {
        let _ = st.close();
        return Err(e.into());
    }
    st.close()?;

    let m = metrics::snapshot();
    println!("OK: snapshot of '{}' written to '{}'", src.display(), store.display());
    println!("  dirs      = {}", m.dirs_mirrored);
    println!("  copied    = {} ({} bytes)", m.files_copied, m.bytes_copied);
    println!("  recorded  = {} ({} bytes hashed)", m.files_recorded, m.bytes_hashed);
    println!("  symlinks  = {}", m.symlinks_mirrored);
    println!("  filtered  = {}", m.entries_filtered);
    Ok(())
}
