//! In-process expiring draft store.
//!
//! Serves two roles: the default store for single-instance deployments, and
//! the transparent fallback when the remote backend is unreachable. Entries
//! are pruned lazily on access.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::draft::Draft;
use crate::error::StoreError;
use crate::session::{SessionStore, draft_key};

#[derive(Default)]
pub struct MemoryStore {
    // Values are stored JSON-encoded so get/set round-trips through the same
    // serialization path as the remote backend.
    entries: Mutex<HashMap<String, Entry>>,
}

struct Entry {
    expires_at: Instant,
    payload: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|e| e.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, conversation_id: &str) -> Result<Option<Draft>, StoreError> {
        let key = draft_key(conversation_id);
        let mut entries = self.entries.lock().await;

        let Some(entry) = entries.get(&key) else {
            return Ok(None);
        };
        if entry.expires_at <= Instant::now() {
            entries.remove(&key);
            return Ok(None);
        }

        let draft = serde_json::from_str(&entry.payload)
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(Some(draft))
    }

    async fn set(
        &self,
        conversation_id: &str,
        draft: &Draft,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let payload =
            serde_json::to_string(draft).map_err(|e| StoreError::Decode(e.to_string()))?;

        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            draft_key(conversation_id),
            Entry {
                expires_at: now + ttl,
                payload,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::Step;

    #[tokio::test]
    async fn roundtrip_within_ttl() {
        let store = MemoryStore::new();
        let mut draft = Draft::default();
        draft.step = Step::AwaitQty;
        draft.qty = Some(3);

        store
            .set("conv-1", &draft, Duration::from_secs(60))
            .await
            .unwrap();
        let loaded = store.get("conv-1").await.unwrap();
        assert_eq!(loaded, Some(draft));
    }

    #[tokio::test]
    async fn absent_key_returns_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entry_is_absent() {
        let store = MemoryStore::new();
        let draft = Draft::default();

        store
            .set("conv-1", &draft, Duration::from_millis(30))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.get("conv-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_refreshes_expiry() {
        let store = MemoryStore::new();
        let draft = Draft::default();

        store
            .set("conv-1", &draft, Duration::from_millis(30))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        store
            .set("conv-1", &draft, Duration::from_millis(100))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(store.get("conv-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_entries_are_pruned_on_write() {
        let store = MemoryStore::new();
        let draft = Draft::default();

        store
            .set("old", &draft, Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        store
            .set("new", &draft, Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn conversations_are_isolated() {
        let store = MemoryStore::new();
        let mut a = Draft::default();
        a.qty = Some(1);
        let mut b = Draft::default();
        b.qty = Some(2);

        store.set("a", &a, Duration::from_secs(60)).await.unwrap();
        store.set("b", &b, Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.get("a").await.unwrap().unwrap().qty, Some(1));
        assert_eq!(store.get("b").await.unwrap().unwrap().qty, Some(2));
    }
}
