use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::{EvaluationError, MatchEvaluationCoordinator};
use crate::matches::{MatchResult, MatchStatus};

/// Match state changes that affect scoring.
///
/// Events represent facts reported by the match-management side after it has
/// persisted the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchEvent {
    /// The match moved to finished
    Finished { match_id: Uuid },

    /// The final score of a finished match was edited
    ScoreCorrected { match_id: Uuid },

    /// A finished match moved back to scheduled or live
    Reopened { match_id: Uuid },

    /// A finished match was cancelled
    Cancelled { match_id: Uuid },
}

impl MatchEvent {
    pub fn match_id(&self) -> Uuid {
        match self {
            MatchEvent::Finished { match_id }
            | MatchEvent::ScoreCorrected { match_id }
            | MatchEvent::Reopened { match_id }
            | MatchEvent::Cancelled { match_id } => *match_id,
        }
    }

    /// Derives the event, if any, from the match before and after a save.
    /// `previous` is None when the prior state is unknown.
    pub fn from_transition(previous: Option<&MatchResult>, current: &MatchResult) -> Option<Self> {
        let match_id = current.id;
        let was_finished = previous.map(MatchResult::is_finished);

        match (was_finished, current.is_finished()) {
            (Some(false), true) => Some(MatchEvent::Finished { match_id }),
            (None, true) if current.previously_evaluated => {
                Some(MatchEvent::ScoreCorrected { match_id })
            }
            (None, true) => Some(MatchEvent::Finished { match_id }),
            (Some(true), true) => {
                let changed = previous.and_then(MatchResult::final_score) != current.final_score();
                changed.then_some(MatchEvent::ScoreCorrected { match_id })
            }
            (Some(true), false) if current.status == MatchStatus::Cancelled => {
                Some(MatchEvent::Cancelled { match_id })
            }
            (Some(true), false) => Some(MatchEvent::Reopened { match_id }),
            // Unknown prior state: a previous evaluation may still be applied.
            (None, false) if current.previously_evaluated => {
                if current.status == MatchStatus::Cancelled {
                    Some(MatchEvent::Cancelled { match_id })
                } else {
                    Some(MatchEvent::Reopened { match_id })
                }
            }
            (None, false) | (Some(false), false) => None,
        }
    }
}

/// Errors that can occur when handling match events
#[derive(Debug, Error)]
pub enum MatchEventError {
    #[error("Retryable error: {0}")]
    Retryable(String),

    #[error("Non-retryable error: {0}")]
    NonRetryable(String),
}

impl MatchEventError {
    /// Whether this error indicates the operation should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, MatchEventError::Retryable(_))
    }
}

impl From<EvaluationError> for MatchEventError {
    fn from(err: EvaluationError) -> Self {
        if err.is_retryable() {
            MatchEventError::Retryable(err.to_string())
        } else {
            MatchEventError::NonRetryable(err.to_string())
        }
    }
}

/// Trait for components that react to match state changes.
///
/// Handlers should be idempotent: receiving the same event twice must be safe.
#[async_trait]
pub trait MatchEventHandler: Send + Sync {
    async fn handle(&self, event: &MatchEvent) -> Result<(), MatchEventError>;

    /// Get a human-readable name for this handler (for logging/debugging)
    fn name(&self) -> &'static str;
}

/// Keeps predictions and leaderboards in step with match results
pub struct EvaluationEventHandler {
    coordinator: Arc<MatchEvaluationCoordinator>,
}

impl EvaluationEventHandler {
    pub fn new(coordinator: Arc<MatchEvaluationCoordinator>) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl MatchEventHandler for EvaluationEventHandler {
    async fn handle(&self, event: &MatchEvent) -> Result<(), MatchEventError> {
        let match_id = event.match_id();
        let result = match event {
            MatchEvent::Finished { .. } | MatchEvent::ScoreCorrected { .. } => {
                self.coordinator.reevaluate(match_id).await
            }
            MatchEvent::Reopened { .. } | MatchEvent::Cancelled { .. } => {
                self.coordinator.revert(match_id).await
            }
        };

        match result {
            Ok(report) => {
                info!(
                    match_id = %match_id,
                    ?event,
                    evaluated = report.evaluated,
                    reverted = report.reverted,
                    "Match event handled"
                );
                Ok(())
            }
            Err(err) => {
                warn!(match_id = %match_id, ?event, error = %err, "Match event handling failed");
                Err(err.into())
            }
        }
    }

    fn name(&self) -> &'static str {
        "EvaluationEventHandler"
    }
}
