use thiserror::Error;

use crate::shared::AppError;

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("Storage error: {0}")]
    Storage(#[from] AppError),
}

impl From<LeaderboardError> for AppError {
    fn from(err: LeaderboardError) -> Self {
        match err {
            // Storage details stay in the logs.
            LeaderboardError::Storage(_) => AppError::Internal,
        }
    }
}
