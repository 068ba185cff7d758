//! Per-user session state: the rolling conversation window and the
//! pending locked-document slot, both with TTL expiry.
//!
//! Keys never collide across users, so each pipeline only touches its own
//! entries; a mutex over the map is enough with one in-flight pipeline per
//! user.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use cofrin_core::conversation::{ConversationState, CONTEXT_TTL_SECS};
use tokio::sync::Mutex;

/// A locked document waiting for its password. At most one per user; the
/// user's next text message is treated as a password attempt.
#[derive(Debug, Clone)]
pub struct PendingDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
}

struct Entry<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Entry<T> {
    fn live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Default)]
pub struct SessionStore {
    contexts: Mutex<HashMap<String, Entry<ConversationState>>>,
    pending: Mutex<HashMap<String, Entry<PendingDocument>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conversation window for a user; missing or expired yields empty.
    pub async fn context(&self, user_id: &str) -> ConversationState {
        let map = self.contexts.lock().await;
        match map.get(user_id) {
            Some(e) if e.live() => e.value.clone(),
            _ => ConversationState::new(),
        }
    }

    pub async fn set_context(&self, user_id: &str, state: ConversationState, ttl: Duration) {
        let mut map = self.contexts.lock().await;
        map.insert(
            user_id.to_string(),
            Entry {
                value: state,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Record one exchange and refresh the 24h TTL.
    pub async fn append_exchange(&self, user_id: &str, user: &str, assistant: &str) {
        let mut state = self.context(user_id).await;
        state.push_exchange(user, assistant);
        self.set_context(user_id, state, Duration::from_secs(CONTEXT_TTL_SECS))
            .await;
    }

    pub async fn pending_document(&self, user_id: &str) -> Option<PendingDocument> {
        let map = self.pending.lock().await;
        map.get(user_id).filter(|e| e.live()).map(|e| e.value.clone())
    }

    /// Park a locked document. A new submission replaces the old slot.
    pub async fn set_pending_document(&self, user_id: &str, doc: PendingDocument) {
        let mut map = self.pending.lock().await;
        map.insert(
            user_id.to_string(),
            Entry {
                value: doc,
                expires_at: Instant::now() + Duration::from_secs(CONTEXT_TTL_SECS),
            },
        );
    }

    pub async fn clear_pending_document(&self, user_id: &str) {
        let mut map = self.pending.lock().await;
        map.remove(user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_context_is_empty() {
        let s = SessionStore::new();
        assert!(s.context("nobody").await.is_empty());
    }

    #[tokio::test]
    async fn test_append_exchange_roundtrip() {
        let s = SessionStore::new();
        s.append_exchange("u1", "gastei 20", "anotado").await;
        let ctx = s.context("u1").await;
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.turns()[0].content, "gastei 20");
    }

    #[tokio::test]
    async fn test_contexts_are_per_user() {
        let s = SessionStore::new();
        s.append_exchange("u1", "a", "b").await;
        assert!(s.context("u2").await.is_empty());
    }

    #[tokio::test]
    async fn test_expired_context_reads_empty() {
        let s = SessionStore::new();
        s.set_context("u1", ConversationState::new(), Duration::from_millis(5))
            .await;
        s.append_exchange("u1", "x", "y").await;
        s.set_context("u1", s.context("u1").await, Duration::from_millis(5))
            .await;
        std::thread::sleep(Duration::from_millis(10));
        assert!(s.context("u1").await.is_empty());
    }

    #[tokio::test]
    async fn test_pending_document_single_slot() {
        let s = SessionStore::new();
        assert!(s.pending_document("u1").await.is_none());
        s.set_pending_document(
            "u1",
            PendingDocument {
                bytes: vec![1, 2],
                filename: "fatura.pdf".to_string(),
            },
        )
        .await;
        // Replacement wins
        s.set_pending_document(
            "u1",
            PendingDocument {
                bytes: vec![3],
                filename: "outra.pdf".to_string(),
            },
        )
        .await;
        let doc = s.pending_document("u1").await.unwrap();
        assert_eq!(doc.filename, "outra.pdf");
        s.clear_pending_document("u1").await;
        assert!(s.pending_document("u1").await.is_none());
    }
}
