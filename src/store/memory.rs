use super::{FactRecord, FactStore};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Process-local store. Outage switches let callers exercise the failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, FactRecord>>,
    lookups: AtomicUsize,
    upserts: AtomicUsize,
    fail_lookups: AtomicBool,
    fail_upserts: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = FactRecord>) -> Self {
        let store = Self::new();
        store
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(records.into_iter().map(|r| (r.name.clone(), r)));
        store
    }

    pub fn set_fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Attempted upserts, failed ones included.
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn get(&self, name: &str) -> Option<FactRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).get(name).cloned()
    }
}

#[async_trait]
impl FactStore for MemoryStore {
    async fn lookup(&self, name: &str) -> Result<Option<FactRecord>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store lookups disabled".to_string()));
        }
        Ok(self.get(name))
    }

    async fn upsert(&self, record: FactRecord) -> Result<(), StoreError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store writes disabled".to_string()));
        }
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.name.clone(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn last_write_wins() {
        let store = MemoryStore::new();
        store.upsert(FactRecord::new("Chile", "first")).await.unwrap();
        store.upsert(FactRecord::new("Chile", "second")).await.unwrap();
        assert_eq!(store.lookup("Chile").await.unwrap(), Some(FactRecord::new("Chile", "second")));
        assert_eq!(store.lookup("chile").await.unwrap(), None);
    }

    #[tokio::test]
    async fn outages_are_errors() {
        let store = MemoryStore::with_records([FactRecord::new("Peru", "Machu Picchu.")]);
        store.set_fail_lookups(true);
        assert!(store.lookup("Peru").await.is_err());
        store.set_fail_upserts(true);
        assert!(store.upsert(FactRecord::new("Peru", "x")).await.is_err());
        assert_eq!(store.get("Peru"), Some(FactRecord::new("Peru", "Machu Picchu.")));
        assert_eq!((store.lookup_count(), store.upsert_count()), (1, 1));
    }
}
