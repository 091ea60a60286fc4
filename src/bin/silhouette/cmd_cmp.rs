use anyhow::Result;
use std::path::PathBuf;

use silhouette::{AccessMode, Store};

use crate::util;

pub fn exec(
    store: PathBuf,
    file: PathBuf,
    entry: PathBuf,
    hash: Option<String>,
    backend: Option<String>,
    mount_point: Option<PathBuf>,
) -> Result<()> {
    let cfg = util::store_config(hash, backend, None, mount_point, None)?;
    let st = Store::open_with_config(&store, AccessMode::ReadOnly, cfg)?;
    let res = st.compare(&file, &entry);
    st.close()?;

    if res? {
        println!("MATCH '{}'", file.display());
        Ok(())
    } else {
        println!("MISMATCH '{}'", file.display());
        std::process::exit(1);
    }
}
