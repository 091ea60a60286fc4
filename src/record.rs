// src/record.rs — кодек записи снапшота (fixed width).
//
// Формат записи (BE):
// u64 size            — исходный размер файла в байтах
// [digest_len] bytes  — сырой digest содержимого
//
// Политика:
// - Ширина записи фиксирована: 8 + digest_len (порог записи, threshold).
//   Файлы размером < threshold зеркалируются байт в байт; файлы размером
//   >= threshold заменяются одной записью. Запись не бывает длиннее
//   оригинала (size >= threshold = длина записи).
// - decode принимает ровно threshold байт, любая другая длина — ошибка.
// - Digest хранится сырыми байтами, без hex и без разделителей.

use std::sync::Arc;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::consts::SIZE_PREFIX_LEN;
use crate::errors::{Error, Result};
use crate::hasher::HashStrategy;

/// Декодированная запись: размер + digest исходного файла.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub size: u64,
    pub digest: Vec<u8>,
}

/// Кодек записей поверх выбранной digest-стратегии.
#[derive(Clone)]
pub struct RecordCodec {
    strategy: Arc<dyn HashStrategy>,
}

impl RecordCodec {
    pub fn new(strategy: Arc<dyn HashStrategy>) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &Arc<dyn HashStrategy> {
        &self.strategy
    }

    /// Порог записи: файлы этого размера и больше хранятся записью.
    pub fn threshold(&self) -> u64 {
        (SIZE_PREFIX_LEN + self.strategy.digest_len()) as u64
    }

    /// Закодировать запись. Длина digest'а обязана совпадать со стратегией.
    pub fn encode(&self, size: u64, digest: &[u8]) -> Result<Vec<u8>> {
        if digest.len() != self.strategy.digest_len() {
            return Err(Error::invalid(format!(
                "digest length {} does not match {} ({} bytes)",
                digest.len(),
                self.strategy.name(),
                self.strategy.digest_len()
            )));
        }
        let mut out = Vec::with_capacity(self.threshold() as usize);
        out.write_u64::<BigEndian>(size)?;
        out.extend_from_slice(digest);
        Ok(out)
    }

    /// Раскодировать запись; длина проверяется строго.
    pub fn decode(&self, bytes: &[u8]) -> Result<Record> {
        if bytes.len() as u64 != self.threshold() {
            return Err(Error::invalid(format!(
                "record must be exactly {} bytes for {}, got {}",
                self.threshold(),
                self.strategy.name(),
                bytes.len()
            )));
        }
        let mut rd = &bytes[..SIZE_PREFIX_LEN];
        let size = rd.read_u64::<BigEndian>()?;
        Ok(Record {
            size,
            digest: bytes[SIZE_PREFIX_LEN..].to_vec(),
        })
    }
}
