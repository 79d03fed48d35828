//! Durable fact storage shared across sessions.
//!
//! Lookups return zero or one record; a missing record is not an error.
//! Upserts are keyed by subject name and last write wins.

use crate::config::StoreKind;
use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

pub mod file;
pub mod memory;
pub mod supabase;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

/// A stored fact row, keyed by country name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRecord {
    pub name: String,
    #[serde(default)]
    pub fun_fact: Option<String>,
}

impl FactRecord {
    pub fn new(name: impl Into<String>, fun_fact: impl Into<String>) -> Self {
        Self { name: name.into(), fun_fact: Some(fun_fact.into()) }
    }

    /// The fact, if present and not blank.
    pub fn usable_fact(&self) -> Option<&str> {
        self.fun_fact.as_deref().map(str::trim).filter(|f| !f.is_empty())
    }
}

#[async_trait]
pub trait FactStore: Send + Sync + Debug {
    async fn lookup(&self, name: &str) -> Result<Option<FactRecord>, StoreError>;

    async fn upsert(&self, record: FactRecord) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: FactStore + ?Sized> FactStore for Arc<S> {
    async fn lookup(&self, name: &str) -> Result<Option<FactRecord>, StoreError> {
        self.as_ref().lookup(name).await
    }

    async fn upsert(&self, record: FactRecord) -> Result<(), StoreError> {
        self.as_ref().upsert(record).await
    }
}

/// Open the store described by `kind`.
pub fn open(kind: &StoreKind) -> Arc<dyn FactStore> {
    match kind {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::File(path) => Arc::new(FileStore::new(path.clone())),
        StoreKind::Supabase { url, anon_key } => Arc::new(SupabaseStore::new(url.clone(), anon_key.clone())),
    }
}
