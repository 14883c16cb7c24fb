use thiserror::Error;
use uuid::Uuid;

use crate::leaderboard::LeaderboardError;
use crate::shared::AppError;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Match {match_id} cannot be evaluated: {reason}")]
    InvalidState { match_id: Uuid, reason: String },

    #[error("Match {match_id} has an ambiguous final score {home}:{away}")]
    AmbiguousResult { match_id: Uuid, home: u32, away: u32 },

    #[error("Storage error: {0}")]
    Storage(#[from] AppError),

    #[error("Evaluation task for match {match_id} did not complete: {reason}")]
    TaskFailed { match_id: Uuid, reason: String },
}

impl EvaluationError {
    pub fn invalid_state(match_id: Uuid, reason: impl Into<String>) -> Self {
        EvaluationError::InvalidState {
            match_id,
            reason: reason.into(),
        }
    }

    /// Storage and task failures may succeed on retry; the others need the
    /// match fixed first
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EvaluationError::Storage(_) | EvaluationError::TaskFailed { .. }
        )
    }
}

impl From<LeaderboardError> for EvaluationError {
    fn from(err: LeaderboardError) -> Self {
        match err {
            LeaderboardError::Storage(e) => EvaluationError::Storage(e),
        }
    }
}

impl From<EvaluationError> for AppError {
    fn from(err: EvaluationError) -> Self {
        match err {
            EvaluationError::InvalidState { .. } | EvaluationError::AmbiguousResult { .. } => {
                AppError::InvalidState(err.to_string())
            }
            // Storage details stay in the logs.
            EvaluationError::Storage(_) | EvaluationError::TaskFailed { .. } => AppError::Internal,
        }
    }
}
