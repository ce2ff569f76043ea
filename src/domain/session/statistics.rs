//! Derived session statistics and summary views.

use serde::Serialize;
use std::collections::HashMap;

use crate::domain::foundation::{ChatId, Timestamp};
use crate::domain::pathology::Pathology;

/// Statistics for a single session, computed on demand from its turns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatistics {
    pub total_turns: usize,
    pub user_turns: usize,
    pub assistant_turns: usize,
    pub avg_user_length: f64,
    pub avg_assistant_length: f64,
    pub duration_minutes: f64,
    pub at_turn_ceiling: bool,
}

/// Metadata-only view of a session for listings.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: ChatId,
    pub pathology: Pathology,
    pub created_at: Timestamp,
    pub turn_count: usize,
}

/// Aggregate statistics across all live sessions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GlobalStatistics {
    pub total_sessions: usize,
    pub total_turns: usize,
    pub pathology_distribution: HashMap<Pathology, usize>,
    pub avg_turns_per_session: f64,
}
