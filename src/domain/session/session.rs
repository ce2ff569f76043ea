//! Chat session aggregate: an ordered turn sequence bound to a pathology.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ChatId, Timestamp};
use crate::domain::pathology::Pathology;

use super::statistics::SessionStatistics;

/// Role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// System instructions (the hidden persona prompt).
    System,
    /// The clinician driving the interview.
    User,
    /// The simulated patient.
    Assistant,
}

/// One turn in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn new(role: TurnRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(TurnRole::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(TurnRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, text)
    }
}

/// A single chat session.
///
/// Invariant: the first turn is always the system prompt. It is never
/// removed; `reset` truncates back to exactly that one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    id: ChatId,
    pathology: Pathology,
    created_at: Timestamp,
    updated_at: Timestamp,
    system_prompt: String,
    turns: Vec<Turn>,
}

impl ChatSession {
    /// Creates a session seeded with exactly the system prompt.
    pub fn new(id: ChatId, system_prompt: impl Into<String>, pathology: Pathology) -> Self {
        let system_prompt = system_prompt.into();
        let now = Timestamp::now();
        Self {
            id,
            pathology,
            created_at: now,
            updated_at: now,
            turns: vec![Turn::system(system_prompt.clone())],
            system_prompt,
        }
    }

    pub fn id(&self) -> ChatId {
        self.id
    }

    pub fn pathology(&self) -> Pathology {
        self.pathology
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Appends a turn and refreshes the activity timestamp.
    pub fn append(&mut self, role: TurnRole, text: impl Into<String>) {
        self.turns.push(Turn::new(role, text));
        self.updated_at = Timestamp::now();
    }

    /// Removes the most recent turn if it is a user turn.
    ///
    /// Used to roll a conversation back to a clean state after a failed
    /// generation, so retries do not see a dangling user message.
    pub fn rollback_user_turn(&mut self) -> bool {
        if matches!(
            self.turns.last(),
            Some(Turn {
                role: TurnRole::User,
                ..
            })
        ) {
            self.turns.pop();
            self.updated_at = Timestamp::now();
            true
        } else {
            false
        }
    }

    /// Truncates back to the original system prompt, preserving the
    /// pathology binding.
    pub fn reset(&mut self) {
        self.turns = vec![Turn::system(self.system_prompt.clone())];
        self.updated_at = Timestamp::now();
    }

    /// Checks whether this session has been idle longer than `hours`.
    pub fn is_expired(&self, hours: i64) -> bool {
        Timestamp::now().is_after(&self.updated_at.add_hours(hours))
    }

    /// Checks whether the conversation has reached the advisory ceiling.
    ///
    /// Advisory only: callers are signaled to reset, but writes are never
    /// rejected.
    pub fn is_at_turn_ceiling(&self, ceiling: usize) -> bool {
        self.turns.len() >= ceiling
    }

    pub fn user_turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(|t| t.role == TurnRole::User)
    }

    pub fn assistant_turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(|t| t.role == TurnRole::Assistant)
    }

    /// Pairs each user turn with the assistant turn that answered it.
    pub fn conversation_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::new();
        let mut pending_user: Option<&str> = None;

        for turn in &self.turns {
            match turn.role {
                TurnRole::User => pending_user = Some(&turn.text),
                TurnRole::Assistant => {
                    if let Some(user) = pending_user.take() {
                        pairs.push((user, turn.text.as_str()));
                    }
                }
                TurnRole::System => {}
            }
        }

        pairs
    }

    /// Shifts the activity timestamp into the past. Test-only hook for
    /// exercising expiry behavior.
    #[cfg(test)]
    pub(crate) fn backdate_for_test(&mut self, hours: i64) {
        self.updated_at = self.updated_at.minus_hours(hours);
    }

    /// Derives statistics from the stored turns. Nothing here is stored
    /// redundantly.
    pub fn statistics(&self, turn_ceiling: usize) -> SessionStatistics {
        let user_lengths: Vec<usize> = self.user_turns().map(|t| t.text.len()).collect();
        let assistant_lengths: Vec<usize> = self.assistant_turns().map(|t| t.text.len()).collect();

        let mean = |lengths: &[usize]| {
            lengths.iter().sum::<usize>() as f64 / lengths.len().max(1) as f64
        };

        SessionStatistics {
            total_turns: self.turns.len(),
            user_turns: user_lengths.len(),
            assistant_turns: assistant_lengths.len(),
            avg_user_length: mean(&user_lengths),
            avg_assistant_length: mean(&assistant_lengths),
            duration_minutes: self.updated_at.duration_since(&self.created_at).num_seconds()
                as f64
                / 60.0,
            at_turn_ceiling: self.is_at_turn_ceiling(turn_ceiling),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ChatSession {
        ChatSession::new(ChatId::new(), "system prompt", Pathology::DentalCaries)
    }

    #[test]
    fn new_session_holds_exactly_the_system_prompt() {
        let s = session();
        assert_eq!(s.turns().len(), 1);
        assert_eq!(s.turns()[0].role, TurnRole::System);
        assert_eq!(s.turns()[0].text, "system prompt");
        assert_eq!(s.pathology(), Pathology::DentalCaries);
    }

    #[test]
    fn append_preserves_turn_order() {
        let mut s = session();
        s.append(TurnRole::User, "Where does it hurt?");
        s.append(TurnRole::Assistant, "My back tooth.");

        let roles: Vec<TurnRole> = s.turns().iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![TurnRole::System, TurnRole::User, TurnRole::Assistant]
        );
    }

    #[test]
    fn reset_truncates_to_system_prompt_only() {
        let mut s = session();
        for _ in 0..5 {
            s.append(TurnRole::User, "question");
            s.append(TurnRole::Assistant, "answer");
        }
        assert_eq!(s.turns().len(), 11);

        s.reset();

        assert_eq!(s.turns().len(), 1);
        assert_eq!(s.turns()[0].text, "system prompt");
        assert_eq!(s.pathology(), Pathology::DentalCaries);
    }

    #[test]
    fn rollback_removes_trailing_user_turn_only() {
        let mut s = session();
        s.append(TurnRole::User, "dangling");
        assert!(s.rollback_user_turn());
        assert_eq!(s.turns().len(), 1);

        // A trailing assistant turn is left alone.
        s.append(TurnRole::User, "question");
        s.append(TurnRole::Assistant, "answer");
        assert!(!s.rollback_user_turn());
        assert_eq!(s.turns().len(), 3);
    }

    #[test]
    fn fresh_session_is_not_expired() {
        assert!(!session().is_expired(24));
    }

    #[test]
    fn turn_ceiling_is_reported_not_enforced() {
        let mut s = session();
        for _ in 0..100 {
            s.append(TurnRole::User, "more");
        }
        assert!(s.is_at_turn_ceiling(100));
        // Writes past the ceiling still land.
        s.append(TurnRole::User, "over the ceiling");
        assert_eq!(s.turns().len(), 102);
    }

    #[test]
    fn conversation_pairs_match_user_and_assistant() {
        let mut s = session();
        s.append(TurnRole::User, "q1");
        s.append(TurnRole::Assistant, "a1");
        s.append(TurnRole::User, "q2");
        s.append(TurnRole::Assistant, "a2");
        // Unanswered user turn forms no pair.
        s.append(TurnRole::User, "q3");

        assert_eq!(s.conversation_pairs(), vec![("q1", "a1"), ("q2", "a2")]);
    }

    #[test]
    fn statistics_derive_from_turns() {
        let mut s = session();
        s.append(TurnRole::User, "1234");
        s.append(TurnRole::Assistant, "12345678");
        s.append(TurnRole::User, "12");

        let stats = s.statistics(100);
        assert_eq!(stats.total_turns, 4);
        assert_eq!(stats.user_turns, 2);
        assert_eq!(stats.assistant_turns, 1);
        assert_eq!(stats.avg_user_length, 3.0);
        assert_eq!(stats.avg_assistant_length, 8.0);
        assert!(!stats.at_turn_ceiling);
    }

    #[test]
    fn statistics_handle_empty_role_groups() {
        let stats = session().statistics(100);
        assert_eq!(stats.user_turns, 0);
        assert_eq!(stats.avg_user_length, 0.0);
    }
}
