use super::{FactRecord, FactStore};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredFact {
    fun_fact: Option<String>,
    updated_at: DateTime<Utc>,
}

/// Facts kept in a single JSON document on disk, keyed by country name.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path, write_lock: Mutex::new(()) }
    }

    async fn load(&self) -> Result<BTreeMap<String, StoredFact>, StoreError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, facts: &BTreeMap<String, StoredFact>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let body = serde_json::to_vec_pretty(facts)?;
        let staging = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&staging).await?;
        file.write_all(&body).await?;
        file.flush().await?;
        drop(file);
        fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl FactStore for FileStore {
    #[instrument(target = "flag_quiz::store", skip(self), fields(path = %self.path.display()))]
    async fn lookup(&self, name: &str) -> Result<Option<FactRecord>, StoreError> {
        let facts = self.load().await?;
        let record = facts
            .get(name)
            .map(|stored| FactRecord { name: name.to_string(), fun_fact: stored.fun_fact.clone() });
        debug!(found = record.is_some(), "file store lookup");
        Ok(record)
    }

    #[instrument(target = "flag_quiz::store", skip(self, record), fields(path = %self.path.display(), name = %record.name))]
    async fn upsert(&self, record: FactRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut facts = self.load().await?;
        facts.insert(record.name, StoredFact { fun_fact: record.fun_fact, updated_at: Utc::now() });
        self.save(&facts).await?;
        debug!(entries = facts.len(), "file store updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("facts.json"));
        assert_eq!(store.lookup("Canada").await.unwrap(), None);
    }

    #[tokio::test]
    async fn upsert_then_lookup_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facts.json");
        let store = FileStore::new(path.clone());
        store.upsert(FactRecord::new("Canada", "Canada has the longest coastline.")).await.unwrap();
        store.upsert(FactRecord::new("Brazil", "Brazil borders ten countries.")).await.unwrap();
        store.upsert(FactRecord::new("Canada", "Canada has over two million lakes.")).await.unwrap();

        let reopened = FileStore::new(path);
        assert_eq!(
            reopened.lookup("Canada").await.unwrap(),
            Some(FactRecord::new("Canada", "Canada has over two million lakes."))
        );
        assert!(reopened.lookup("Brazil").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn upsert_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("facts.json");
        let store = FileStore::new(path.clone());
        store.upsert(FactRecord::new("Japan", "Japan has over 6,800 islands.")).await.unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facts.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FileStore::new(path);
        assert!(matches!(store.lookup("Canada").await, Err(StoreError::Serde(_))));
    }
}
