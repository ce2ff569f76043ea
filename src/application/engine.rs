//! PatientEngine - the dependency-injected conversation engine façade.
//!
//! Construct one engine at process start and pass references into every
//! request handler. There is no module-level singleton: tests run isolated
//! engines side by side, each with its own store and backend.

use std::sync::Arc;

use crate::adapters::backends::{select_backend, Degradation, SelectedBackend};
use crate::adapters::SessionStore;
use crate::config::{BackendKind, EngineConfig, SessionConfig};
use crate::domain::foundation::{ChatId, Timestamp};
use crate::domain::generation::GenerationParams;
use crate::domain::pathology::{catalog_entries, Pathology, PathologyEntry};
use crate::domain::prompt;
use crate::domain::safety::{OutputSanitizer, ResponseValidator};
use crate::domain::session::{
    ChatSession, GlobalStatistics, SessionStatistics, SessionSummary, TurnRole,
};
use crate::ports::{BackendInfo, GenerationBackend};

use super::error::EngineError;

/// Result of creating a session.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub id: ChatId,
    pub pathology: Pathology,
    pub created_at: Timestamp,
}

/// Result of one completed turn exchange.
#[derive(Debug, Clone)]
pub struct TurnReply {
    /// The sanitized patient reply.
    pub reply: String,
    pub id: ChatId,
    /// Turn count after the exchange (system turn included).
    pub turn_count: usize,
    /// Advisory warning once the conversation nears its ceiling. Callers
    /// may surface or ignore it.
    pub length_warning: Option<String>,
}

/// Engine health for readiness reporting.
#[derive(Debug, Clone)]
pub struct EngineHealth {
    /// "healthy", or "degraded" when running on the fallback backend.
    pub status: &'static str,
    pub backend: BackendInfo,
    /// The backend that was requested but failed to construct.
    pub degraded_from: Option<BackendKind>,
    pub degradation_reason: Option<String>,
    pub uptime_secs: u64,
}

/// The conversation engine core.
pub struct PatientEngine {
    store: Arc<SessionStore>,
    backend: Arc<dyn GenerationBackend>,
    degradation: Option<Degradation>,
    sanitizer: OutputSanitizer,
    validator: ResponseValidator,
    session_config: SessionConfig,
    started_at: Timestamp,
}

impl PatientEngine {
    /// Builds an engine from configuration, selecting the configured
    /// backend and degrading to the mock if construction fails.
    pub fn new(config: &EngineConfig) -> Self {
        let selected = select_backend(&config.backend);
        Self::from_selection(config, selected)
    }

    /// Builds an engine around an explicit backend. Intended for tests and
    /// embedders that compose their own backend.
    pub fn with_backend(config: &EngineConfig, backend: Arc<dyn GenerationBackend>) -> Self {
        Self::from_selection(
            config,
            SelectedBackend {
                backend,
                degradation: None,
            },
        )
    }

    fn from_selection(config: &EngineConfig, selected: SelectedBackend) -> Self {
        Self {
            store: Arc::new(SessionStore::new()),
            backend: selected.backend,
            degradation: selected.degradation,
            sanitizer: OutputSanitizer::default(),
            validator: ResponseValidator::default(),
            session_config: config.session,
            started_at: Timestamp::now(),
        }
    }

    /// Creates a session for the given pathology key, or a random
    /// pathology when none is supplied.
    ///
    /// Unknown keys are rejected before any session state exists.
    pub async fn create_session(
        &self,
        pathology: Option<&str>,
    ) -> Result<CreatedSession, EngineError> {
        let pathology = match pathology {
            Some(key) => Pathology::parse(key)
                .ok_or_else(|| EngineError::unknown_pathology(key, Pathology::keys()))?,
            None => Pathology::random(),
        };

        let profile = pathology.profile();
        let system_prompt = prompt::compose(&profile.label, profile);
        let id = self.store.create(system_prompt, pathology).await;

        let created_at = self
            .store
            .snapshot(id)
            .await
            .map(|s| s.created_at())
            .unwrap_or_else(Timestamp::now);

        tracing::info!(chat_id = %id, pathology = %pathology, "session created");

        Ok(CreatedSession {
            id,
            pathology,
            created_at,
        })
    }

    /// Sends a clinician message and returns the simulated patient's
    /// sanitized reply.
    ///
    /// On backend failure the user turn is rolled back out of the session
    /// and the failure is surfaced, never swallowed into an empty reply.
    pub async fn send_turn(
        &self,
        id: ChatId,
        message: &str,
        params: Option<GenerationParams>,
    ) -> Result<TurnReply, EngineError> {
        let params = params.unwrap_or_default();

        let before = self
            .store
            .snapshot(id)
            .await
            .ok_or(EngineError::ChatNotFound(id))?;
        let length_warning = self
            .sanitizer
            .conversation_length_warning(before.turns().len());

        if !self.store.append(id, TurnRole::User, message).await {
            return Err(EngineError::ChatNotFound(id));
        }
        let turns = self
            .store
            .turns(id)
            .await
            .ok_or(EngineError::ChatNotFound(id))?;

        match self.backend.generate(&turns, &params).await {
            Ok(raw) => {
                let verdict = self.sanitizer.sanitize(&raw);
                if !verdict.is_safe {
                    tracing::warn!(
                        chat_id = %id,
                        blocked = ?verdict.blocked_phrases_found,
                        "sanitizer removed blocked phrases from reply"
                    );
                }
                let (valid, issues) = self.validator.validate(&verdict.sanitized_text);
                if !valid {
                    tracing::warn!(chat_id = %id, ?issues, "reply failed validation checks");
                }

                if !self
                    .store
                    .append(id, TurnRole::Assistant, verdict.sanitized_text.clone())
                    .await
                {
                    return Err(EngineError::ChatNotFound(id));
                }

                let turn_count = self
                    .store
                    .turns(id)
                    .await
                    .map(|t| t.len())
                    .unwrap_or(turns.len() + 1);

                Ok(TurnReply {
                    reply: verdict.sanitized_text,
                    id,
                    turn_count,
                    length_warning,
                })
            }
            Err(err) => {
                // Roll the dangling user turn back so a retry starts clean.
                self.store.rollback_user_turn(id).await;
                tracing::error!(chat_id = %id, error = %err, "generation failed");
                Err(EngineError::Generation(err))
            }
        }
    }

    /// Returns the full turn history of a session.
    pub async fn get_session(&self, id: ChatId) -> Result<ChatSession, EngineError> {
        self.store
            .snapshot(id)
            .await
            .ok_or(EngineError::ChatNotFound(id))
    }

    /// Truncates a session back to its system prompt, keeping id and
    /// pathology.
    pub async fn reset_session(&self, id: ChatId) -> Result<(), EngineError> {
        if self.store.reset(id).await {
            Ok(())
        } else {
            Err(EngineError::ChatNotFound(id))
        }
    }

    /// Permanently removes a session.
    pub async fn delete_session(&self, id: ChatId) -> Result<(), EngineError> {
        if self.store.delete(id).await {
            Ok(())
        } else {
            Err(EngineError::ChatNotFound(id))
        }
    }

    /// Metadata summaries of all live sessions.
    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        self.store.list().await
    }

    /// The pathology catalog.
    pub fn list_pathologies(&self) -> Vec<PathologyEntry> {
        catalog_entries()
    }

    /// Removes sessions idle longer than the threshold (hours); defaults
    /// to the configured expiry. Returns the count removed.
    pub async fn expire_sweep(&self, hours: Option<i64>) -> usize {
        let hours = hours.unwrap_or(self.session_config.expiry_hours);
        let removed = self.store.expire_sweep(hours).await;
        if removed > 0 {
            tracing::info!(removed, hours, "expired idle sessions");
        }
        removed
    }

    /// Statistics for one session.
    pub async fn statistics(&self, id: ChatId) -> Result<SessionStatistics, EngineError> {
        self.store
            .statistics(id, self.session_config.turn_ceiling)
            .await
            .ok_or(EngineError::ChatNotFound(id))
    }

    /// Aggregate statistics across all live sessions.
    pub async fn global_statistics(&self) -> GlobalStatistics {
        self.store.global_statistics().await
    }

    /// Health/readiness report, including whether the engine is running on
    /// a degraded (mock) backend.
    pub fn health(&self) -> EngineHealth {
        EngineHealth {
            status: if self.degradation.is_some() {
                "degraded"
            } else {
                "healthy"
            },
            backend: self.backend.info(),
            degraded_from: self.degradation.as_ref().map(|d| d.requested),
            degradation_reason: self.degradation.as_ref().map(|d| d.reason.clone()),
            uptime_secs: Timestamp::now().secs_since(&self.started_at),
        }
    }
}
