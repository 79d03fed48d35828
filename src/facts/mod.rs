//! Fun-fact resolution: session cache, then the durable store, then the model.
//!
//! A [`FactResolver`] owns the volatile cache of one game. Cloning it shares
//! that cache, so a clone can be moved into a spawned task.

use crate::core::{LowLevelClient, QueryResolver};
use crate::error::{ResolutionError, WriteBackError};
use crate::store::{FactRecord, FactStore};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

pub mod explorer;

pub use explorer::{CountryData, CountryExplorer, CountryInfo};

/// Prompt sent to the model for `subject`.
pub fn fact_prompt(subject: &str) -> String {
    format!(
        "Tell me a fun and interesting fact about {}. Keep it concise and engaging, under 200 characters.",
        subject
    )
}

/// Where a resolved fact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactOrigin {
    SessionCache,
    Store,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    pub subject: String,
    pub text: String,
    pub origin: FactOrigin,
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Counters since the resolver was built. Restarts do not reset them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub cache_hits: u64,
    pub store_hits: u64,
    pub generated: u64,
    pub write_back_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    cache_hits: AtomicU64,
    store_hits: AtomicU64,
    generated: AtomicU64,
    write_back_failures: AtomicU64,
}

#[derive(Debug, Default)]
struct SessionCache {
    // Bumped on every clear; results tagged with an older epoch are dropped.
    epoch: u64,
    entries: HashMap<String, String>,
}

#[derive(Debug)]
struct Inner<C: LowLevelClient> {
    query: QueryResolver<C>,
    store: Arc<dyn FactStore>,
    cache: Mutex<SessionCache>,
    counters: Counters,
}

pub struct FactResolver<C: LowLevelClient> {
    inner: Arc<Inner<C>>,
}

impl<C: LowLevelClient> Clone for FactResolver<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<C: LowLevelClient> fmt::Debug for FactResolver<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactResolver")
            .field("store", &self.inner.store)
            .field("stats", &self.stats())
            .finish()
    }
}

impl<C: LowLevelClient> FactResolver<C> {
    pub fn new(query: QueryResolver<C>, store: Arc<dyn FactStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                query,
                store,
                cache: Mutex::new(SessionCache::default()),
                counters: Counters::default(),
            }),
        }
    }

    fn cache(&self) -> MutexGuard<'_, SessionCache> {
        self.inner.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve a fun fact for `subject`.
    ///
    /// Order is fixed: session cache, durable store, then one generation call.
    /// Concurrent calls for the same uncached subject are not merged; each one
    /// goes to the store and the model on its own.
    pub async fn resolve_fact(&self, subject: &str) -> Result<Fact, ResolutionError> {
        let epoch = self.session_epoch();
        self.resolve_in_session(epoch, subject).await
    }

    /// Identifies the current session; bumped by every cache clear.
    pub(crate) fn session_epoch(&self) -> u64 {
        self.cache().epoch
    }

    /// Like [`resolve_fact`](Self::resolve_fact), but a result is only cached
    /// if the session identified by `epoch` is still current.
    #[instrument(target = "flag_quiz::facts", skip(self))]
    pub(crate) async fn resolve_in_session(&self, epoch: u64, subject: &str) -> Result<Fact, ResolutionError> {
        let hit = self.cache().entries.get(subject).cloned();
        if let Some(text) = hit {
            self.inner.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            debug!("session cache hit");
            return Ok(Fact { subject: subject.to_string(), text, origin: FactOrigin::SessionCache });
        }

        let record = self
            .inner
            .store
            .lookup(subject)
            .await
            .map_err(|source| ResolutionError::Lookup { subject: subject.to_string(), source })?;

        if let Some(text) = record.as_ref().and_then(FactRecord::usable_fact) {
            self.inner.counters.store_hits.fetch_add(1, Ordering::Relaxed);
            debug!("durable store hit");
            self.remember(epoch, subject, text);
            return Ok(Fact { subject: subject.to_string(), text: text.to_string(), origin: FactOrigin::Store });
        }

        let text = self
            .inner
            .query
            .ask_text(fact_prompt(subject))
            .await
            .map_err(|source| ResolutionError::Generation { subject: subject.to_string(), source })?;
        if text.is_empty() {
            warn!("model returned an empty fact");
            return Err(ResolutionError::EmptyFact(subject.to_string()));
        }

        self.inner.counters.generated.fetch_add(1, Ordering::Relaxed);
        info!(fact_len = text.len(), "generated new fact");
        self.remember(epoch, subject, &text);
        self.write_back(subject, &text).await;

        Ok(Fact { subject: subject.to_string(), text, origin: FactOrigin::Generated })
    }

    async fn write_back(&self, subject: &str, text: &str) {
        let record = FactRecord::new(subject, text);
        if let Err(source) = self.inner.store.upsert(record).await {
            let err = WriteBackError { subject: subject.to_string(), source };
            self.inner.counters.write_back_failures.fetch_add(1, Ordering::Relaxed);
            warn!(error = %err, "fact write-back failed");
        }
    }

    fn remember(&self, epoch: u64, subject: &str, text: &str) {
        let mut cache = self.cache();
        if cache.epoch != epoch {
            debug!(subject, "dropping fact resolved for a previous session");
            return;
        }
        cache.entries.insert(subject.to_string(), text.to_string());
    }

    /// The session-cached fact for `subject`, if any. Never suspends.
    pub fn cached(&self, subject: &str) -> Option<String> {
        self.cache().entries.get(subject).cloned()
    }

    pub fn cached_count(&self) -> usize {
        self.cache().entries.len()
    }

    /// Forget every session-cached fact. Resolutions still in flight keep
    /// running and return to their callers, but their results stay out of the
    /// new session's cache.
    pub fn clear_session_cache(&self) {
        let mut cache = self.cache();
        cache.epoch += 1;
        cache.entries.clear();
        debug!(target: "flag_quiz::facts", epoch = cache.epoch, "session cache cleared");
    }

    pub fn stats(&self) -> ResolverStats {
        let c = &self.inner.counters;
        ResolverStats {
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
            store_hits: c.store_hits.load(Ordering::Relaxed),
            generated: c.generated.load(Ordering::Relaxed),
            write_back_failures: c.write_back_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::mock::{MockClient, MockResponse};
    use crate::core::QueryConfig;
    use crate::store::MemoryStore;

    fn resolver(responses: Vec<MockResponse>) -> (FactResolver<MockClient>, Arc<crate::clients::MockHandle>, Arc<MemoryStore>) {
        let (client, handle) = MockClient::with_responses(responses);
        let store = Arc::new(MemoryStore::new());
        let resolver = FactResolver::new(QueryResolver::new(client, QueryConfig::default()), store.clone());
        (resolver, handle, store)
    }

    #[test]
    fn prompt_names_the_subject() {
        let prompt = fact_prompt("Brazil");
        assert!(prompt.contains("about Brazil."));
        assert!(prompt.contains("under 200 characters"));
    }

    #[tokio::test]
    async fn generated_fact_is_cached_and_written_back() {
        let (resolver, handle, store) = resolver(vec![MockResponse::Success(
            "  Brazil is named after a tree.\n".to_string(),
        )]);

        let first = resolver.resolve_fact("Brazil").await.unwrap();
        assert_eq!(first.text, "Brazil is named after a tree.");
        assert_eq!(first.origin, FactOrigin::Generated);

        let second = resolver.resolve_fact("Brazil").await.unwrap();
        assert_eq!(second.origin, FactOrigin::SessionCache);
        assert_eq!(handle.call_count(), 1);
        assert_eq!(store.get("Brazil"), Some(FactRecord::new("Brazil", "Brazil is named after a tree.")));
    }

    #[tokio::test]
    async fn stale_result_skips_cleared_cache() {
        let (resolver, _handle, _store) = resolver(vec![MockResponse::Success("fact".to_string())]);
        let epoch = resolver.session_epoch();
        resolver.clear_session_cache();
        resolver.remember(epoch, "Japan", "old");
        assert_eq!(resolver.cached("Japan"), None);
        resolver.remember(epoch + 1, "Japan", "new");
        assert_eq!(resolver.cached("Japan").as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn subjects_are_case_sensitive() {
        let (resolver, handle, _store) = resolver(vec![
            MockResponse::Success("one".to_string()),
            MockResponse::Success("two".to_string()),
        ]);
        resolver.resolve_fact("Japan").await.unwrap();
        resolver.resolve_fact("japan").await.unwrap();
        assert_eq!(handle.call_count(), 2);
        assert_eq!(resolver.cached_count(), 2);
    }
}
