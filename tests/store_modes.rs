// tests/store_modes.rs
//
// Запуск только этого файла:
//   cargo test --test store_modes -- --nocapture
//
// Покрываем:
// 1) Гейты режимов: WriteOnly запрещает getdir/compare, ReadOnly - save.
// 2) ReadWrite: полный цикл save -> compare -> rebuild.
// 3) save пересобирает содержимое стора с нуля.
// 4) Dir-бэкенд: создание при записи, ошибка Backend при чтении пустого места.
// 5) Drop без close не мешает повторному открытию.
// 6) Манифест обновляется после save и задаёт порог кодека.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use silhouette::{AccessMode, Error, HashAlgo, Store, StoreConfig};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("siltest-store-{prefix}-{pid}-{t}-{id}"))
}

fn none() -> &'static [&'static str] {
    &[]
}

fn make_src(prefix: &str) -> Result<PathBuf> {
    let src = unique_root(prefix);
    fs::create_dir_all(&src)?;
    fs::write(src.join("a.txt"), b"alpha")?;
    fs::write(src.join("big.bin"), vec![b'z'; 2000])?;
    Ok(src)
}

#[test]
fn write_only_rejects_reader_ops() -> Result<()> {
    let src = make_src("wo-src")?;
    let root = unique_root("wo-store");

    let mut st = Store::open_with_config(&root, AccessMode::WriteOnly, StoreConfig::default())?;
    st.save(&src, none(), none())?;

    let err = st.getdir().unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }), "{err}");
    let err = st.compare(&src.join("a.txt"), &PathBuf::from("a.txt")).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }), "{err}");
    st.close()?;

    // Перечитываем то, что записали.
    let st = Store::open_with_config(&root, AccessMode::ReadOnly, StoreConfig::default())?;
    assert!(st.compare(&src.join("a.txt"), &PathBuf::from("a.txt"))?);
    assert!(st.compare(&src.join("big.bin"), &PathBuf::from("big.bin"))?);
    st.close()?;
    Ok(())
}

#[test]
fn read_only_rejects_save() -> Result<()> {
    let src = make_src("ro-src")?;
    let root = unique_root("ro-store");

    let mut st = Store::open_with_config(&root, AccessMode::WriteOnly, StoreConfig::default())?;
    st.save(&src, none(), none())?;
    st.close()?;

    let mut st = Store::open_with_config(&root, AccessMode::ReadOnly, StoreConfig::default())?;
    let err = st.save(&src, none(), none()).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }), "{err}");
    st.close()?;
    Ok(())
}

#[test]
fn read_write_full_cycle() -> Result<()> {
    let src = make_src("rw-src")?;
    let root = unique_root("rw-store");

    let mut st = Store::open_with_config(&root, AccessMode::ReadWrite, StoreConfig::default())?;
    assert!(st.manifest().is_none());
    st.save(&src, none(), none())?;

    // Манифест подхвачен сразу после сборки.
    assert_eq!(st.manifest().map(|m| m.hash.as_str()), Some("md5"));
    assert_eq!(st.threshold(), 24);

    assert!(st.getdir()?.is_dir());
    assert!(st.compare(&src.join("a.txt"), &PathBuf::from("a.txt"))?);

    fs::write(src.join("a.txt"), b"ALPHA")?;
    assert!(!st.compare(&src.join("a.txt"), &PathBuf::from("a.txt"))?);
    st.close()?;
    Ok(())
}

#[test]
fn save_replaces_previous_content() -> Result<()> {
    let src = make_src("repl-src")?;
    let root = unique_root("repl-store");

    let mut st = Store::open_with_config(&root, AccessMode::ReadWrite, StoreConfig::default())?;
    st.save(&src, none(), none())?;

    // Мусор в сторе и смена состава источника.
    fs::write(st.getdir()?.join("stray.bin"), b"stray")?;
    fs::remove_file(src.join("a.txt"))?;
    fs::write(src.join("b.txt"), b"bravo")?;

    st.save(&src, none(), none())?;
    let dir = st.getdir()?;
    assert!(!dir.join("stray.bin").exists());
    assert!(!dir.join("a.txt").exists());
    assert_eq!(fs::read(dir.join("b.txt"))?, b"bravo");
    st.close()?;
    Ok(())
}

#[test]
fn read_only_missing_store_is_backend_error() {
    let root = unique_root("missing-store");
    let err = Store::open_with_config(&root, AccessMode::ReadOnly, StoreConfig::default())
        .err()
        .expect("open of a missing store must fail");
    assert!(matches!(err, Error::Backend { .. }), "{err}");
}

#[test]
fn drop_without_close_releases_store() -> Result<()> {
    let src = make_src("drop-src")?;
    let root = unique_root("drop-store");

    {
        let mut st = Store::open_with_config(&root, AccessMode::WriteOnly, StoreConfig::default())?;
        st.save(&src, none(), none())?;
        // Без close: Drop обязан отпустить бэкенд.
    }

    let st = Store::open_with_config(&root, AccessMode::ReadOnly, StoreConfig::default())?;
    assert!(st.compare(&src.join("a.txt"), &PathBuf::from("a.txt"))?);
    st.close()?;
    Ok(())
}

#[test]
fn sha256_store_has_wider_threshold() -> Result<()> {
    let src = make_src("sha-src")?;
    let root = unique_root("sha-store");

    let cfg = StoreConfig::default().with_hash(Some(HashAlgo::Sha256));
    let mut st = Store::open_with_config(&root, AccessMode::ReadWrite, cfg)?;
    st.save(&src, none(), none())?;
    assert_eq!(st.threshold(), 40);
    assert_eq!(st.manifest().map(|m| m.hash.as_str()), Some("sha256"));

    // Запись фиксированной ширины нового порога.
    assert_eq!(fs::metadata(st.getdir()?.join("big.bin"))?.len(), 40);
    assert!(st.compare(&src.join("big.bin"), &PathBuf::from("big.bin"))?);
    st.close()?;
    Ok(())
}

#[test]
fn env_defaults_open() -> Result<()> {
    std::env::set_var("SIL_HASH", "md5");
    std::env::set_var("SIL_BACKEND", "dir");

    let src = make_src("env-src")?;
    let root = unique_root("env-store");

    let mut st = Store::open(&root, AccessMode::ReadWrite)?;
    st.save(&src, none(), none())?;
    assert_eq!(st.threshold(), 24);
    assert!(st.compare(&src.join("big.bin"), &PathBuf::from("big.bin"))?);
    st.close()?;
    Ok(())
}
