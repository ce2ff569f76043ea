//! In-memory session store.
//!
//! Sessions are explicitly ephemeral: losing all state on process restart
//! is acceptable and documented. The map is guarded by one lock while each
//! session carries its own, so mutations to a single session are atomic
//! and operations on different sessions do not block each other.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{ChatId, Timestamp};
use crate::domain::pathology::Pathology;
use crate::domain::session::{
    ChatSession, GlobalStatistics, SessionStatistics, SessionSummary, Turn, TurnRole,
};

/// Owns all live conversation sessions.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<ChatId, Arc<RwLock<ChatSession>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session seeded with exactly the system prompt and returns
    /// its fresh identifier.
    pub async fn create(&self, system_prompt: impl Into<String>, pathology: Pathology) -> ChatId {
        let id = ChatId::new();
        let session = ChatSession::new(id, system_prompt, pathology);
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(RwLock::new(session)));
        id
    }

    async fn session(&self, id: ChatId) -> Option<Arc<RwLock<ChatSession>>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Appends a turn, refreshing the activity timestamp.
    ///
    /// Returns false if the session no longer exists; callers must check
    /// this before assuming success.
    pub async fn append(&self, id: ChatId, role: TurnRole, text: impl Into<String>) -> bool {
        match self.session(id).await {
            Some(session) => {
                session.write().await.append(role, text);
                true
            }
            None => false,
        }
    }

    /// Removes the most recent turn if it is a user turn.
    ///
    /// Used after a failed generation so retries see a clean history.
    pub async fn rollback_user_turn(&self, id: ChatId) -> bool {
        match self.session(id).await {
            Some(session) => session.write().await.rollback_user_turn(),
            None => false,
        }
    }

    /// Returns a point-in-time copy of the session.
    pub async fn snapshot(&self, id: ChatId) -> Option<ChatSession> {
        match self.session(id).await {
            Some(session) => Some(session.read().await.clone()),
            None => None,
        }
    }

    /// Returns a copy of the session's turns.
    pub async fn turns(&self, id: ChatId) -> Option<Vec<Turn>> {
        match self.session(id).await {
            Some(session) => Some(session.read().await.turns().to_vec()),
            None => None,
        }
    }

    /// Truncates the session back to its system prompt.
    pub async fn reset(&self, id: ChatId) -> bool {
        match self.session(id).await {
            Some(session) => {
                session.write().await.reset();
                true
            }
            None => false,
        }
    }

    /// Removes the session. Subsequent lookups report not-found.
    pub async fn delete(&self, id: ChatId) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn contains(&self, id: ChatId) -> bool {
        self.sessions.read().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Removes every session idle longer than `hours`. Returns the count
    /// removed. Maintenance operation, not tied to any request.
    pub async fn expire_sweep(&self, hours: i64) -> usize {
        let cutoff = Timestamp::now().minus_hours(hours);
        let mut sessions = self.sessions.write().await;

        let mut expired = Vec::new();
        for (id, session) in sessions.iter() {
            if session.read().await.updated_at().is_before(&cutoff) {
                expired.push(*id);
            }
        }
        for id in &expired {
            sessions.remove(id);
        }

        expired.len()
    }

    /// Derives statistics for one session.
    pub async fn statistics(&self, id: ChatId, turn_ceiling: usize) -> Option<SessionStatistics> {
        match self.session(id).await {
            Some(session) => Some(session.read().await.statistics(turn_ceiling)),
            None => None,
        }
    }

    /// Aggregate statistics across all live sessions.
    pub async fn global_statistics(&self) -> GlobalStatistics {
        let sessions = self.sessions.read().await;
        if sessions.is_empty() {
            return GlobalStatistics::default();
        }

        let mut total_turns = 0;
        let mut pathology_distribution: HashMap<Pathology, usize> = HashMap::new();
        for session in sessions.values() {
            let session = session.read().await;
            total_turns += session.turns().len();
            *pathology_distribution.entry(session.pathology()).or_insert(0) += 1;
        }

        GlobalStatistics {
            total_sessions: sessions.len(),
            total_turns,
            pathology_distribution,
            avg_turns_per_session: total_turns as f64 / sessions.len() as f64,
        }
    }

    /// Metadata-only summaries of all live sessions.
    pub async fn list(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().await;
        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions.values() {
            let session = session.read().await;
            summaries.push(SessionSummary {
                id: session.id(),
                pathology: session.pathology(),
                created_at: session.created_at(),
                turn_count: session.turns().len(),
            });
        }
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_session() -> (SessionStore, ChatId) {
        let store = SessionStore::new();
        let id = store.create("system prompt", Pathology::DentalCaries).await;
        (store, id)
    }

    #[tokio::test]
    async fn create_seeds_single_system_turn() {
        let (store, id) = store_with_session().await;

        let session = store.snapshot(id).await.unwrap();
        assert_eq!(session.turns().len(), 1);
        assert_eq!(session.turns()[0].role, TurnRole::System);
        assert_eq!(session.pathology(), Pathology::DentalCaries);
    }

    #[tokio::test]
    async fn append_to_missing_session_signals_not_found() {
        let store = SessionStore::new();
        assert!(!store.append(ChatId::new(), TurnRole::User, "hello").await);
    }

    #[tokio::test]
    async fn reset_returns_session_to_system_prompt() {
        let (store, id) = store_with_session().await;
        for _ in 0..4 {
            store.append(id, TurnRole::User, "q").await;
            store.append(id, TurnRole::Assistant, "a").await;
        }

        assert!(store.reset(id).await);

        let session = store.snapshot(id).await.unwrap();
        assert_eq!(session.turns().len(), 1);
        assert_eq!(session.turns()[0].text, "system prompt");
    }

    #[tokio::test]
    async fn delete_makes_session_not_found() {
        let (store, id) = store_with_session().await;

        assert!(store.delete(id).await);
        assert!(!store.contains(id).await);
        assert!(store.snapshot(id).await.is_none());
        // Double delete reports not-found.
        assert!(!store.delete(id).await);
    }

    #[tokio::test]
    async fn rollback_pops_only_trailing_user_turn() {
        let (store, id) = store_with_session().await;
        store.append(id, TurnRole::User, "dangling").await;

        assert!(store.rollback_user_turn(id).await);
        assert_eq!(store.turns(id).await.unwrap().len(), 1);

        store.append(id, TurnRole::User, "q").await;
        store.append(id, TurnRole::Assistant, "a").await;
        assert!(!store.rollback_user_turn(id).await);
        assert_eq!(store.turns(id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn expire_sweep_removes_exactly_the_idle_sessions() {
        let (store, stale_id) = store_with_session().await;
        let fresh_id = store.create("prompt", Pathology::Pericoronitis).await;

        // Backdate one session past the 24h threshold.
        {
            let sessions = store.sessions.read().await;
            let mut stale = sessions.get(&stale_id).unwrap().write().await;
            stale.backdate_for_test(25);
        }

        let removed = store.expire_sweep(24).await;
        assert_eq!(removed, 1);
        assert!(!store.contains(stale_id).await);
        assert!(store.contains(fresh_id).await);
    }

    #[tokio::test]
    async fn expire_sweep_keeps_active_sessions() {
        let (store, id) = store_with_session().await;
        let removed = store.expire_sweep(24).await;
        assert_eq!(removed, 0);
        assert!(store.contains(id).await);
    }

    #[tokio::test]
    async fn global_statistics_aggregate_across_sessions() {
        let store = SessionStore::new();
        let a = store.create("p", Pathology::DentalCaries).await;
        let _b = store.create("p", Pathology::DentalCaries).await;
        let _c = store.create("p", Pathology::Pericoronitis).await;
        store.append(a, TurnRole::User, "hello").await;

        let stats = store.global_statistics().await;
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.total_turns, 4);
        assert_eq!(stats.pathology_distribution[&Pathology::DentalCaries], 2);
        assert_eq!(stats.pathology_distribution[&Pathology::Pericoronitis], 1);
    }

    #[tokio::test]
    async fn global_statistics_empty_store() {
        let store = SessionStore::new();
        let stats = store.global_statistics().await;
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.avg_turns_per_session, 0.0);
    }

    #[tokio::test]
    async fn list_returns_metadata_summaries() {
        let (store, id) = store_with_session().await;
        store.append(id, TurnRole::User, "q").await;

        let summaries = store.list().await;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, id);
        assert_eq!(summaries[0].turn_count, 2);
    }

    #[tokio::test]
    async fn concurrent_appends_to_same_session_do_not_corrupt_order() {
        let (store, id) = store_with_session().await;
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.append(id, TurnRole::User, format!("turn {}", i)).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        let session = store.snapshot(id).await.unwrap();
        // System turn plus every append; each turn is intact.
        assert_eq!(session.turns().len(), 17);
        assert!(session
            .turns()
            .iter()
            .skip(1)
            .all(|t| t.text.starts_with("turn ")));
    }
}
