//! Lightweight global metrics for silhouette.
//!
//! Потокобезопасные атомарные счётчики для подсистем:
//! - Builder (зеркалирование дерева)
//! - Comparator
//! - Store lifecycle

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Builder -----
static DIRS_MIRRORED: AtomicU64 = AtomicU64::new(0);
static FILES_COPIED: AtomicU64 = AtomicU64::new(0);
static FILES_RECORDED: AtomicU64 = AtomicU64::new(0);
static SYMLINKS_MIRRORED: AtomicU64 = AtomicU64::new(0);
static ENTRIES_FILTERED: AtomicU64 = AtomicU64::new(0);
static BYTES_COPIED: AtomicU64 = AtomicU64::new(0);
static BYTES_HASHED: AtomicU64 = AtomicU64::new(0);

// ----- Comparator -----
static COMPARES_TOTAL: AtomicU64 = AtomicU64::new(0);
static COMPARE_MISMATCHES: AtomicU64 = AtomicU64::new(0);

// ----- Store lifecycle -----
static STORES_OPENED: AtomicU64 = AtomicU64::new(0);
static SAVES_TOTAL: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    // Builder
    pub dirs_mirrored: u64,
    pub files_copied: u64,
    pub files_recorded: u64,
    pub symlinks_mirrored: u64,
    pub entries_filtered: u64,
    pub bytes_copied: u64,
    pub bytes_hashed: u64,

    // Comparator
    pub compares_total: u64,
    pub compare_mismatches: u64,

    // Store lifecycle
    pub stores_opened: u64,
    pub saves_total: u64,
}

impl MetricsSnapshot {
    pub fn mismatch_ratio(&self) -> f64 {
        if self.compares_total == 0 {
            0.0
        } else {
            self.compare_mismatches as f64 / self.compares_total as f64
        }
    }
}

// ----- Recorders (Builder) -----
pub fn record_dir_mirrored() {
    DIRS_MIRRORED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_file_copied(bytes: u64) {
    FILES_COPIED.fetch_add(1, Ordering::Relaxed);
    BYTES_COPIED.fetch_add(bytes, Ordering::Relaxed);
}

pub fn record_file_recorded(bytes_hashed: u64) {
    FILES_RECORDED.fetch_add(1, Ordering::Relaxed);
    BYTES_HASHED.fetch_add(bytes_hashed, Ordering::Relaxed);
}

pub fn record_symlink_mirrored() {
    SYMLINKS_MIRRORED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_entry_filtered() {
    ENTRIES_FILTERED.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Comparator) -----
pub fn record_compare(matched: bool) {
    COMPARES_TOTAL.fetch_add(1, Ordering::Relaxed);
    if !matched {
        COMPARE_MISMATCHES.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_compare_bytes_hashed(bytes: u64) {
    BYTES_HASHED.fetch_add(bytes, Ordering::Relaxed);
}

// ----- Recorders (Store lifecycle) -----
pub fn record_store_opened() {
    STORES_OPENED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_save() {
    SAVES_TOTAL.fetch_add(1, Ordering::Relaxed);
}

// ----- Snapshot / Reset -----
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        dirs_mirrored: DIRS_MIRRORED.load(Ordering::Relaxed),
        files_copied: FILES_COPIED.load(Ordering::Relaxed),
        files_recorded: FILES_RECORDED.load(Ordering::Relaxed),
        symlinks_mirrored: SYMLINKS_MIRRORED.load(Ordering::Relaxed),
        entries_filtered: ENTRIES_FILTERED.load(Ordering::Relaxed),
        bytes_copied: BYTES_COPIED.load(Ordering::Relaxed),
        bytes_hashed: BYTES_HASHED.load(Ordering::Relaxed),

        compares_total: COMPARES_TOTAL.load(Ordering::Relaxed),
        compare_mismatches: COMPARE_MISMATCHES.load(Ordering::Relaxed),

        stores_opened: STORES_OPENED.load(Ordering::Relaxed),
        saves_total: SAVES_TOTAL.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    DIRS_MIRRORED.store(0, Ordering::Relaxed);
    FILES_COPIED.store(0, Ordering::Relaxed);
    FILES_RECORDED.store(0, Ordering::Relaxed);
    SYMLINKS_MIRRORED.store(0, Ordering::Relaxed);
    ENTRIES_FILTERED.store(0, Ordering::Relaxed);
    BYTES_COPIED.store(0, Ordering::Relaxed);
    BYTES_HASHED.store(0, Ordering::Relaxed);

    COMPARES_TOTAL.store(0, Ordering::Relaxed);
    COMPARE_MISMATCHES.store(0, Ordering::Relaxed);

    STORES_OPENED.store(0, Ordering::Relaxed);
    SAVES_TOTAL.store(0, Ordering::Relaxed);
}
