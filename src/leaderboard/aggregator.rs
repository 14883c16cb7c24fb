use std::sync::Arc;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use super::{
    models::{AggregateDelta, LeaderboardEntry, Sign},
    repository::LeaderboardRepository,
    LeaderboardError,
};
use crate::scoring::{Category, Outcome};

/// Folds single prediction outcomes into leaderboard entries.
/// Never touches rank fields; those belong to the rank recalculator.
#[derive(Clone)]
pub struct LeaderboardAggregator {
    repository: Arc<dyn LeaderboardRepository>,
}

impl LeaderboardAggregator {
    pub fn new(repository: Arc<dyn LeaderboardRepository>) -> Self {
        Self { repository }
    }

    /// Adds (`Sign::Apply`) or removes (`Sign::Undo`) one prediction's
    /// contribution. A missing entry is created zeroed first.
    #[instrument(skip(self))]
    pub async fn apply(
        &self,
        user_id: Uuid,
        competition_id: Uuid,
        category: Category,
        points: i32,
        sign: Sign,
    ) -> Result<LeaderboardEntry, LeaderboardError> {
        let delta = AggregateDelta {
            user_id,
            competition_id,
            category,
            points,
            sign,
        };

        let entry = self.repository.apply_delta(&delta).await.map_err(|e| {
            warn!(
                user_id = %user_id,
                competition_id = %competition_id,
                error = %e,
                "Failed to apply leaderboard delta"
            );
            LeaderboardError::from(e)
        })?;

        if entry.has_negative_totals() {
            // Only reachable if an undo ran without a matching apply.
            error!(
                user_id = %user_id,
                competition_id = %competition_id,
                category = %category,
                points,
                ?sign,
                total_points = entry.total_points,
                total_matches = entry.total_matches,
                "Leaderboard entry went negative"
            );
        }

        debug!(
            user_id = %user_id,
            competition_id = %competition_id,
            total_points = entry.total_points,
            total_matches = entry.total_matches,
            "Leaderboard delta applied"
        );
        Ok(entry)
    }

    pub async fn apply_outcome(
        &self,
        user_id: Uuid,
        competition_id: Uuid,
        outcome: Outcome,
        sign: Sign,
    ) -> Result<LeaderboardEntry, LeaderboardError> {
        self.apply(user_id, competition_id, outcome.category, outcome.points, sign)
            .await
    }

    /// Creates the zeroed entry when a user joins a competition. Idempotent.
    #[instrument(skip(self))]
    pub async fn join(
        &self,
        user_id: Uuid,
        competition_id: Uuid,
    ) -> Result<LeaderboardEntry, LeaderboardError> {
        Ok(self
            .repository
            .ensure_entry(user_id, competition_id)
            .await?)
    }
}
