// tests/containment.rs
//
// Запуск только этого файла:
//   cargo test --test containment -- --nocapture
//
// Покрываем:
// 1) Выход из корня снапшота через "..", абсолютный путь или симлинк
//    внутри стора - InvalidArgument, а не тихое сравнение.
// 2) Сам корень - не запись.
// 3) Нормализация, остающаяся в корне, работает.
// 4) Лексическая проверка для несуществующих родителей.
// 5) Рукотворный стор без манифеста читается.

use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use silhouette::{build_snapshot, compare_file, AccessMode, Error, Store, StoreConfig};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("siltest-cont-{prefix}-{pid}-{t}-{id}"))
}

fn pin_env() {
    std::env::set_var("SIL_HASH", "md5");
    std::env::set_var("SIL_BACKEND", "dir");
}

fn none() -> &'static [&'static str] {
    &[]
}

fn build_fixture() -> Result<(PathBuf, PathBuf)> {
    let src = unique_root("src");
    let dst = unique_root("dst");
    fs::create_dir_all(src.join("d"))?;
    fs::write(src.join("small.txt"), b"hello")?;
    fs::write(src.join("d/in.txt"), b"inner")?;
    build_snapshot(&src, &dst, none(), none())?;
    Ok((src, dst))
}

fn assert_escape(res: silhouette::Result<bool>) {
    let err = res.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }), "{err}");
}

#[test]
fn parent_traversal_rejected() -> Result<()> {
    pin_env();
    let (src, dst) = build_fixture()?;
    let live = src.join("small.txt");

    assert_escape(compare_file(&live, &dst, Path::new("../outside.txt")));
    assert_escape(compare_file(&live, &dst, Path::new("d/../../outside.txt")));
    Ok(())
}

#[test]
fn absolute_path_outside_rejected() -> Result<()> {
    pin_env();
    let (src, dst) = build_fixture()?;
    let live = src.join("small.txt");

    // Сосед с именем-префиксом корня: "<root>-evil" не внутри "<root>".
    let evil = PathBuf::from(format!("{}-evil", dst.display()));
    fs::create_dir_all(&evil)?;
    fs::write(evil.join("x.bin"), b"evil")?;
    assert_escape(compare_file(&live, &dst, &evil.join("x.bin")));

    assert_escape(compare_file(&live, &dst, Path::new("/etc/hostname")));
    Ok(())
}

#[test]
fn symlink_inside_store_cannot_escape() -> Result<()> {
    pin_env();
    let (src, dst) = build_fixture()?;
    let live = src.join("small.txt");

    let outside = unique_root("outside");
    fs::create_dir_all(&outside)?;
    fs::write(outside.join("secret.txt"), b"secret")?;

    // Симлинк-каталог внутри стора, указывающий наружу.
    symlink(&outside, dst.join("esc"))?;
    assert_escape(compare_file(&live, &dst, Path::new("esc/secret.txt")));
    Ok(())
}

#[test]
fn store_root_is_not_an_entry() -> Result<()> {
    pin_env();
    let (src, dst) = build_fixture()?;
    let live = src.join("small.txt");

    assert_escape(compare_file(&live, &dst, Path::new(".")));
    assert_escape(compare_file(&live, &dst, &dst));
    Ok(())
}

#[test]
fn normalization_staying_inside_is_fine() -> Result<()> {
    pin_env();
    let (src, dst) = build_fixture()?;

    // d/../small.txt схлопывается в small.txt.
    assert!(compare_file(
        &src.join("small.txt"),
        &dst,
        Path::new("d/../small.txt")
    )?);
    Ok(())
}

#[test]
fn missing_parent_checked_lexically() -> Result<()> {
    pin_env();
    let (src, dst) = build_fixture()?;
    let live = src.join("small.txt");

    // Родителя нет, путь лексически внутри - записи просто нет.
    assert!(!compare_file(&live, &dst, Path::new("no_dir/x.bin"))?);

    // Родителя нет и путь лексически выводит наружу - отказ.
    assert_escape(compare_file(&live, &dst, Path::new("no_dir/../../escape.txt")));
    Ok(())
}

#[test]
fn handmade_store_without_manifest_is_readable() -> Result<()> {
    pin_env();
    let root = unique_root("handmade");
    fs::create_dir_all(&root)?;
    fs::write(root.join("note.txt"), b"hi")?;

    let live = unique_root("handmade-live");
    fs::create_dir_all(&live)?;
    fs::write(live.join("note.txt"), b"hi")?;

    let st = Store::open_with_config(&root, AccessMode::ReadOnly, StoreConfig::default())?;
    assert!(st.manifest().is_none());
    assert_eq!(st.threshold(), 24); // md5 по умолчанию
    assert!(st.compare(&live.join("note.txt"), &PathBuf::from("note.txt"))?);
    st.close()?;
    Ok(())
}
