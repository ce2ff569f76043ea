//! Mock patient backend.
//!
//! A pure function of the most recent user turn: coarse keyword matching
//! picks a response category and one of its pre-written replies is chosen
//! pseudo-randomly. Lets the rest of the system run and be tested without
//! a real model, and serves as the degradation target when a configured
//! backend fails to construct.

use async_trait::async_trait;
use rand::Rng;

use crate::domain::generation::GenerationParams;
use crate::domain::session::{Turn, TurnRole};
use crate::ports::{BackendInfo, GenerationBackend, GenerationError};

const PAIN_RESPONSES: &[&str] = &[
    "The pain is sharp and throbbing, mostly in my lower right side.",
    "It hurts a lot, especially when I bite down on something.",
    "The pain comes and goes, but it's been getting worse lately.",
    "It's a dull ache that sometimes becomes very intense.",
];

const LOCATION_RESPONSES: &[&str] = &[
    "It's in my back teeth, on the right side.",
    "The pain seems to be coming from one of my molars.",
    "I think it's the tooth second from the back, lower jaw.",
    "It's hard to tell exactly, but somewhere in the back of my mouth.",
];

const DURATION_RESPONSES: &[&str] = &[
    "It started about three days ago.",
    "I've been having this problem for about a week now.",
    "The pain began suddenly yesterday morning.",
    "It's been bothering me on and off for a few weeks.",
];

const TRIGGER_RESPONSES: &[&str] = &[
    "Cold drinks make it much worse.",
    "It hurts when I eat anything sweet.",
    "Biting down on hard food triggers the pain.",
    "Hot coffee seems to set it off.",
];

const DEFAULT_RESPONSES: &[&str] = &[
    "I'm not sure how to describe it, but it's quite uncomfortable.",
    "Can you explain what you mean? I'm just here because my tooth hurts.",
    "I've never had dental problems like this before.",
    "I just want to find out what's wrong and get some relief.",
    "Is this something serious, doctor?",
];

/// Deterministic-contract mock of a simulated patient.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockPatientBackend;

impl MockPatientBackend {
    pub fn new() -> Self {
        Self
    }

    /// Picks the response pool for the latest user message.
    fn category(user_message: &str) -> &'static [&'static str] {
        let msg = user_message.to_lowercase();
        let contains_any =
            |words: &[&str]| words.iter().any(|w| msg.contains(w));

        if contains_any(&["pain", "hurt", "ache", "sore"]) {
            PAIN_RESPONSES
        } else if contains_any(&["where", "location", "which tooth", "side"]) {
            LOCATION_RESPONSES
        } else if contains_any(&["when", "how long", "start", "began", "duration"]) {
            DURATION_RESPONSES
        } else if contains_any(&["trigger", "worse", "cause", "cold", "hot", "sweet"]) {
            TRIGGER_RESPONSES
        } else {
            DEFAULT_RESPONSES
        }
    }
}

#[async_trait]
impl GenerationBackend for MockPatientBackend {
    async fn generate(
        &self,
        turns: &[Turn],
        _params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        let user_message = turns
            .iter()
            .rev()
            .find(|t| t.role == TurnRole::User)
            .map(|t| t.text.as_str())
            .unwrap_or("");

        let pool = Self::category(user_message);
        let reply = pool[rand::thread_rng().gen_range(0..pool.len())];
        Ok(reply.to_string())
    }

    fn info(&self) -> BackendInfo {
        BackendInfo::new("mock", "mock-patient", "mock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turns_with_user(message: &str) -> Vec<Turn> {
        vec![Turn::system("prompt"), Turn::user(message)]
    }

    async fn reply_for(message: &str) -> String {
        MockPatientBackend::new()
            .generate(&turns_with_user(message), &GenerationParams::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn pain_keywords_select_pain_pool() {
        let reply = reply_for("Describe the pain for me").await;
        assert!(PAIN_RESPONSES.contains(&reply.as_str()));
    }

    #[tokio::test]
    async fn location_keywords_select_location_pool() {
        let reply = reply_for("Where exactly is it?").await;
        assert!(LOCATION_RESPONSES.contains(&reply.as_str()));
    }

    #[tokio::test]
    async fn duration_keywords_select_duration_pool() {
        let reply = reply_for("When did this start?").await;
        assert!(DURATION_RESPONSES.contains(&reply.as_str()));
    }

    #[tokio::test]
    async fn trigger_keywords_select_trigger_pool() {
        let reply = reply_for("Does cold make it worse?").await;
        assert!(TRIGGER_RESPONSES.contains(&reply.as_str()));
    }

    #[tokio::test]
    async fn unmatched_message_selects_default_pool() {
        let reply = reply_for("Tell me about your family dentist").await;
        assert!(DEFAULT_RESPONSES.contains(&reply.as_str()));
    }

    #[tokio::test]
    async fn replies_use_latest_user_turn() {
        let turns = vec![
            Turn::system("prompt"),
            Turn::user("Where is it?"),
            Turn::assistant("My back tooth."),
            Turn::user("When did it start?"),
        ];
        let reply = MockPatientBackend::new()
            .generate(&turns, &GenerationParams::default())
            .await
            .unwrap();
        assert!(DURATION_RESPONSES.contains(&reply.as_str()));
    }

    #[tokio::test]
    async fn empty_history_still_replies() {
        let reply = MockPatientBackend::new()
            .generate(&[], &GenerationParams::default())
            .await
            .unwrap();
        assert!(!reply.is_empty());
    }
}
