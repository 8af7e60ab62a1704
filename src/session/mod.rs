//! Draft persistence — key/value with TTL.
//!
//! One draft per conversation, keyed deterministically from the conversation
//! identifier. There is no locking: two events for the same conversation
//! processed concurrently race on the read-modify-write and the later `set`
//! wins. That is an accepted limitation of the wizard, not an ordering
//! guarantee.

pub mod fallback;
pub mod memory;
pub mod remote;

use std::time::Duration;

use async_trait::async_trait;

use crate::draft::Draft;
use crate::error::StoreError;

pub use fallback::FallbackStore;
pub use memory::MemoryStore;
pub use remote::RemoteStore;

/// Backend-agnostic draft persistence.
///
/// A `set` followed by a `get` within the TTL window returns a draft equal to
/// the one stored; once the TTL elapses the draft is treated as absent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the draft for a conversation, if present and unexpired.
    async fn get(&self, conversation_id: &str) -> Result<Option<Draft>, StoreError>;

    /// Persist the draft, refreshing its expiry.
    async fn set(
        &self,
        conversation_id: &str,
        draft: &Draft,
        ttl: Duration,
    ) -> Result<(), StoreError>;
}

/// Storage key for a conversation's draft.
pub fn draft_key(conversation_id: &str) -> String {
    format!("draft:{conversation_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_deterministic() {
        assert_eq!(draft_key("5511999999999"), "draft:5511999999999");
        assert_eq!(draft_key("abc"), draft_key("abc"));
    }
}
