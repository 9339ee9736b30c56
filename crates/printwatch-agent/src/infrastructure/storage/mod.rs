//! Durable storage for onboarded printer records.
//!
//! The onboarding flow and options flow talk to the [`RecordStore`] trait;
//! the production implementation in [`config`] keeps everything in one
//! TOML file in the platform config directory.

pub mod config;

use std::sync::Mutex;

use printwatch_core::PrinterRecord;

pub use config::{StoreError, TomlRecordStore};

/// Keyed storage for printer records.  The serial number is the key.
pub trait RecordStore: Send + Sync {
    /// Returns the record for `serial`, if one is stored.
    fn get(&self, serial: &str) -> Option<PrinterRecord>;

    /// Returns whether a record with this serial exists.
    fn exists(&self, serial: &str) -> bool {
        self.get(serial).is_some()
    }

    /// Inserts or replaces the record keyed by its serial number.
    fn put(&self, record: PrinterRecord) -> Result<(), StoreError>;

    /// Returns every stored record.
    fn all(&self) -> Vec<PrinterRecord>;
}

/// In-memory store for tests and ephemeral runs; nothing survives the
/// process.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<PrinterRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, serial: &str) -> Option<PrinterRecord> {
        self.records
            .lock()
            .expect("record store lock poisoned")
            .iter()
            .find(|r| r.serial_number == serial)
            .cloned()
    }

    fn put(&self, record: PrinterRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().expect("record store lock poisoned");
        if let Some(existing) = records
            .iter_mut()
            .find(|r| r.serial_number == record.serial_number)
        {
            *existing = record;
        } else {
            records.push(record);
        }
        Ok(())
    }

    fn all(&self) -> Vec<PrinterRecord> {
        self.records
            .lock()
            .expect("record store lock poisoned")
            .clone()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn record(serial: &str, interval: u64) -> PrinterRecord {
        PrinterRecord {
            name: "Workbench".to_string(),
            address: "192.168.1.30".parse().unwrap(),
            serial_number: serial.to_string(),
            check_code: "c0de".to_string(),
            poll_interval_secs: interval,
        }
    }

    #[test]
    fn test_memory_store_get_after_put() {
        let store = MemoryRecordStore::new();
        store.put(record("SN-100", 10)).unwrap();
        assert_eq!(store.get("SN-100").unwrap().poll_interval_secs, 10);
    }

    #[test]
    fn test_memory_store_exists_uses_get() {
        let store = MemoryRecordStore::new();
        assert!(!store.exists("SN-100"));
        store.put(record("SN-100", 10)).unwrap();
        assert!(store.exists("SN-100"));
    }

    #[test]
    fn test_memory_store_put_replaces_by_serial() {
        let store = MemoryRecordStore::new();
        store.put(record("SN-100", 10)).unwrap();
        store.put(record("SN-100", 30)).unwrap();
        assert_eq!(store.all().len(), 1);
        assert_eq!(store.get("SN-100").unwrap().poll_interval_secs, 30);
    }
}
