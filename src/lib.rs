// Базовые модули
pub mod consts;
pub mod errors;
pub mod metrics;
pub mod config;

// Формат снапшота
pub mod hasher;   // digest-стратегии (md5/sha256) + потоковое хеширование
pub mod record;   // кодек записи [size u64 BE][digest]
pub mod manifest; // <root>/.silhouette.json — идентичность алгоритма

// Сборка и сравнение
pub mod filter;   // include/exclude (fnmatch-семантика)
pub mod builder;  // зеркалирование дерева
pub mod compare;  // поэлементное сравнение

// Инфраструктура
pub mod fsx;      // mode/owner/times, files_equal, clear_dir_contents
pub mod backend;  // mount-бэкенды (dir, ext4)
pub mod store;    // Store: open/getdir/save/compare/close

// Удобные реэкспорты
pub use builder::{build_snapshot, SnapshotBuilder};
pub use compare::{compare_file, Comparator};
pub use config::{BackendKind, HashAlgo, StoreConfig};
pub use errors::{Error, Result};
pub use filter::{PatternSet, TreeFilter};
pub use hasher::{HashState, HashStrategy, Md5Strategy, Sha256Strategy};
pub use manifest::SnapshotManifest;
pub use record::{Record, RecordCodec};
pub use store::{AccessMode, Store};

pub use backend::{DirBackend, Ext4Backend, MountBackend};
