//! Remote store with transparent in-process fallback.
//!
//! A misconfigured or unreachable backend must not break the wizard: the
//! failure is logged and the operation is retried against an embedded
//! in-process map with identical TTL semantics. The degradation is an
//! availability trade-off (drafts don't survive a restart and aren't shared
//! across instances) and is never surfaced to the end user.

use std::time::Duration;

use async_trait::async_trait;

use crate::draft::Draft;
use crate::error::StoreError;
use crate::session::{MemoryStore, RemoteStore, SessionStore};

pub struct FallbackStore {
    remote: RemoteStore,
    local: MemoryStore,
}

impl FallbackStore {
    pub fn new(remote: RemoteStore) -> Self {
        Self {
            remote,
            local: MemoryStore::new(),
        }
    }
}

#[async_trait]
impl SessionStore for FallbackStore {
    async fn get(&self, conversation_id: &str) -> Result<Option<Draft>, StoreError> {
        match self.remote.get(conversation_id).await {
            Ok(draft) => Ok(draft),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "session backend degraded; reading draft from in-process store"
                );
                self.local.get(conversation_id).await
            }
        }
    }

    async fn set(
        &self,
        conversation_id: &str,
        draft: &Draft,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        match self.remote.set(conversation_id, draft, ttl).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "session backend degraded; writing draft to in-process store"
                );
                self.local.set(conversation_id, draft, ttl).await
            }
        }
    }
}
