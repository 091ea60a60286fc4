//! Общие константы формата снапшота.

// -------- Record --------
// Запись вместо крупного файла (fixed width):
// [size u64 BE][digest raw bytes]
// Длина записи = 8 + digest_len (md5: 24, sha256: 40).
pub const SIZE_PREFIX_LEN: usize = 8;

// -------- Manifest --------
// JSON-файл в корне снапшота, фиксирует алгоритм digest'а.
// Имя зарезервировано: одноимённый top-level файл источника не зеркалируется.
pub const MANIFEST_FILE: &str = ".silhouette.json";
pub const MANIFEST_VERSION: u32 = 1;

// -------- Defaults --------
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;
pub const DEFAULT_IMAGE_SIZE_MB: u64 = 10;
