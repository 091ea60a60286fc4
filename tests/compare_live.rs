// tests/compare_live.rs
//
// Запуск только этого файла:
//   cargo test --test compare_live -- --nocapture
//
// Покрываем:
// 1) Неизменённое дерево совпадает по всем типам записей.
// 2) Мутация содержимого ловится и для копий, и для записей.
// 3) Смена размера ловится без хеширования.
// 4) Симлинки сравниваются по цели (включая висячие).
// 5) Несовпадение типов, пропавшие записи, каталоги - false, не ошибка.
// 6) Отсутствующий или каталожный live-путь - InvalidArgument.
// 7) Запись длиннее порога - повреждённый снапшот, false.

use std::fs;
use std::os::unix::fs::symlink;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use silhouette::{build_snapshot, compare_file, Error};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("siltest-cmp-{prefix}-{pid}-{t}-{id}"))
}

fn pin_env() {
    std::env::set_var("SIL_HASH", "md5");
    std::env::set_var("SIL_BACKEND", "dir");
}

fn none() -> &'static [&'static str] {
    &[]
}

/// src с малым файлом, большим файлом, записью ровно в порог и симлинками.
fn build_fixture() -> Result<(PathBuf, PathBuf)> {
    let src = unique_root("src");
    let dst = unique_root("dst");
    fs::create_dir_all(src.join("d"))?;
    fs::write(src.join("small.txt"), b"abcde")?;
    fs::write(src.join("big.bin"), vec![b'q'; 5000])?;
    fs::write(src.join("exact24"), vec![b'e'; 24])?;
    fs::write(src.join("d/nested.bin"), vec![b'n'; 100])?;
    symlink("small.txt", src.join("ln"))?;
    symlink("nowhere", src.join("dang"))?;
    build_snapshot(&src, &dst, none(), none())?;
    Ok((src, dst))
}

#[test]
fn unchanged_tree_matches() -> Result<()> {
    pin_env();
    let (src, dst) = build_fixture()?;
    for rel in ["small.txt", "big.bin", "exact24", "d/nested.bin", "ln", "dang"] {
        assert!(
            compare_file(&src.join(rel), &dst, &PathBuf::from(rel))?,
            "mismatch on {rel}"
        );
    }
    Ok(())
}

#[test]
fn content_mutation_detected() -> Result<()> {
    pin_env();
    let (src, dst) = build_fixture()?;

    // Один байт в большом файле, размер прежний.
    let mut big = fs::read(src.join("big.bin"))?;
    big[2500] ^= 0x5A;
    fs::write(src.join("big.bin"), &big)?;
    assert!(!compare_file(&src.join("big.bin"), &dst, &PathBuf::from("big.bin"))?);

    // Один байт в малом файле, размер прежний.
    fs::write(src.join("small.txt"), b"abcdX")?;
    assert!(!compare_file(&src.join("small.txt"), &dst, &PathBuf::from("small.txt"))?);
    Ok(())
}

#[test]
fn size_change_detected() -> Result<()> {
    pin_env();
    let (src, dst) = build_fixture()?;

    // Усечение большого файла.
    let big = fs::read(src.join("big.bin"))?;
    fs::write(src.join("big.bin"), &big[..4999])?;
    assert!(!compare_file(&src.join("big.bin"), &dst, &PathBuf::from("big.bin"))?);

    // Дозапись в малый.
    fs::write(src.join("small.txt"), b"abcdef")?;
    assert!(!compare_file(&src.join("small.txt"), &dst, &PathBuf::from("small.txt"))?);
    Ok(())
}

#[test]
fn symlinks_compared_by_target() -> Result<()> {
    pin_env();
    let (src, dst) = build_fixture()?;

    // Цель сменилась - несовпадение, содержимое цели никого не волнует.
    fs::remove_file(src.join("ln"))?;
    symlink("big.bin", src.join("ln"))?;
    assert!(!compare_file(&src.join("ln"), &dst, &PathBuf::from("ln"))?);

    // Висячая ссылка с той же целью совпадает.
    assert!(compare_file(&src.join("dang"), &dst, &PathBuf::from("dang"))?);
    Ok(())
}

#[test]
fn type_mismatch_is_false() -> Result<()> {
    pin_env();
    let (src, dst) = build_fixture()?;

    // Живой файл против хранимого симлинка.
    assert!(!compare_file(&src.join("small.txt"), &dst, &PathBuf::from("ln"))?);

    // Живой симлинк против хранимой записи.
    assert!(!compare_file(&src.join("ln"), &dst, &PathBuf::from("big.bin"))?);
    Ok(())
}

#[test]
fn missing_or_directory_entry_is_false() -> Result<()> {
    pin_env();
    let (src, dst) = build_fixture()?;

    // Записи нет.
    assert!(!compare_file(&src.join("small.txt"), &dst, &PathBuf::from("not_there"))?);

    // Родителя записи нет.
    assert!(!compare_file(
        &src.join("small.txt"),
        &dst,
        &PathBuf::from("no_dir/x.bin")
    )?);

    // Хранимая запись - каталог.
    assert!(!compare_file(&src.join("small.txt"), &dst, &PathBuf::from("d"))?);
    Ok(())
}

#[test]
fn bad_live_path_is_an_error() -> Result<()> {
    pin_env();
    let (src, dst) = build_fixture()?;

    let err = compare_file(&src.join("gone.txt"), &dst, &PathBuf::from("small.txt")).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }), "{err}");

    let err = compare_file(&src.join("d"), &dst, &PathBuf::from("d")).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }), "{err}");
    Ok(())
}

#[test]
fn oversized_stored_entry_is_false() -> Result<()> {
    pin_env();
    let (src, dst) = build_fixture()?;

    // Рукотворная порча: запись длиннее порога.
    fs::write(dst.join("weird.bin"), vec![0u8; 30])?;
    fs::write(src.join("weird.bin"), vec![0u8; 30])?;
    assert!(!compare_file(&src.join("weird.bin"), &dst, &PathBuf::from("weird.bin"))?);
    Ok(())
}
