use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::models::{Prediction, PredictionStatus};
use crate::matches::repository::goal_count;
use crate::scoring::{Outcome, OutcomeFlags, Score};
use crate::shared::AppError;

/// Trait for prediction repository operations.
///
/// The two write operations are conditional on the current status, so a
/// prediction can never be scored twice or reset twice. Each returns whether
/// the transition happened.
#[async_trait]
pub trait PredictionRepository: Send + Sync {
    async fn get_prediction(&self, prediction_id: Uuid) -> Result<Option<Prediction>, AppError>;

    /// One page of a match's predictions ordered by id, starting after `after`
    async fn list_for_match(
        &self,
        match_id: Uuid,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<Prediction>, AppError>;

    /// Pending -> Evaluated with the given outcome
    async fn mark_evaluated(
        &self,
        prediction_id: Uuid,
        outcome: Outcome,
        score: Score,
    ) -> Result<bool, AppError>;

    /// Evaluated -> Pending with points and flags cleared
    async fn reset_to_pending(&self, prediction_id: Uuid) -> Result<bool, AppError>;
}

/// In-memory implementation of PredictionRepository for development and testing
#[derive(Debug, Default)]
pub struct InMemoryPredictionRepository {
    predictions: RwLock<BTreeMap<Uuid, Prediction>>,
}

impl InMemoryPredictionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or replaces a prediction, standing in for the submission side
    pub async fn save_prediction(&self, prediction: Prediction) {
        self.predictions
            .write()
            .await
            .insert(prediction.id, prediction);
    }

    pub async fn all_predictions(&self) -> Vec<Prediction> {
        self.predictions.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl PredictionRepository for InMemoryPredictionRepository {
    async fn get_prediction(&self, prediction_id: Uuid) -> Result<Option<Prediction>, AppError> {
        Ok(self.predictions.read().await.get(&prediction_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_for_match(
        &self,
        match_id: Uuid,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<Prediction>, AppError> {
        let predictions = self.predictions.read().await;
        let page: Vec<Prediction> = predictions
            .values()
            .filter(|p| p.match_id == match_id)
            .filter(|p| after.map_or(true, |cursor| p.id > cursor))
            .take(limit)
            .cloned()
            .collect();

        debug!(match_id = %match_id, count = page.len(), "Listed prediction page from memory");
        Ok(page)
    }

    #[instrument(skip(self))]
    async fn mark_evaluated(
        &self,
        prediction_id: Uuid,
        outcome: Outcome,
        score: Score,
    ) -> Result<bool, AppError> {
        let mut predictions = self.predictions.write().await;
        match predictions.get_mut(&prediction_id) {
            Some(p) if p.status == PredictionStatus::Pending => {
                p.record_evaluation(outcome, score);
                Ok(true)
            }
            Some(_) => Ok(false),
            None => {
                debug!(prediction_id = %prediction_id, "Prediction vanished before evaluation");
                Ok(false)
            }
        }
    }

    #[instrument(skip(self))]
    async fn reset_to_pending(&self, prediction_id: Uuid) -> Result<bool, AppError> {
        let mut predictions = self.predictions.write().await;
        match predictions.get_mut(&prediction_id) {
            Some(p) if p.status == PredictionStatus::Evaluated => {
                p.reset();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// PostgreSQL implementation of prediction repository
pub struct PostgresPredictionRepository {
    pool: PgPool,
}

impl PostgresPredictionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PREDICTION_COLUMNS: &str = "id, user_id, match_id, predicted_home, predicted_away, points, status, \
     is_exact, is_correct_diff, is_correct_winner_only, is_wrong, evaluated_home, evaluated_away";

fn prediction_from_row(row: &PgRow) -> Result<Prediction, AppError> {
    let status: String = row.get("status");
    let evaluated_home: Option<i32> = row.get("evaluated_home");
    let evaluated_away: Option<i32> = row.get("evaluated_away");

    let evaluated_score = match (evaluated_home, evaluated_away) {
        (Some(home), Some(away)) => Some(Score::new(goal_count(home)?, goal_count(away)?)),
        _ => None,
    };

    Ok(Prediction {
        id: row.get("id"),
        user_id: row.get("user_id"),
        match_id: row.get("match_id"),
        predicted_home: goal_count(row.get("predicted_home"))?,
        predicted_away: goal_count(row.get("predicted_away"))?,
        points: row.get("points"),
        status: status
            .parse()
            .map_err(|_| AppError::DatabaseError(format!("Unknown prediction status: {status}")))?,
        flags: OutcomeFlags {
            exact: row.get("is_exact"),
            correct_diff: row.get("is_correct_diff"),
            correct_winner_only: row.get("is_correct_winner_only"),
            wrong: row.get("is_wrong"),
        },
        evaluated_score,
    })
}

fn goal_param(value: u32) -> Result<i32, AppError> {
    i32::try_from(value).map_err(|_| AppError::DatabaseError(format!("Goal count out of range: {value}")))
}

#[async_trait]
impl PredictionRepository for PostgresPredictionRepository {
    #[instrument(skip(self))]
    async fn get_prediction(&self, prediction_id: Uuid) -> Result<Option<Prediction>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {PREDICTION_COLUMNS} FROM predictions WHERE id = $1"
        ))
        .bind(prediction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, prediction_id = %prediction_id, "Failed to fetch prediction");
            AppError::DatabaseError(e.to_string())
        })?;

        row.as_ref().map(prediction_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn list_for_match(
        &self,
        match_id: Uuid,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<Prediction>, AppError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(&format!(
            "SELECT {PREDICTION_COLUMNS} FROM predictions \
             WHERE match_id = $1 AND ($2::uuid IS NULL OR id > $2) \
             ORDER BY id LIMIT $3"
        ))
        .bind(match_id)
        .bind(after)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, match_id = %match_id, "Failed to list predictions for match");
            AppError::DatabaseError(e.to_string())
        })?;

        rows.iter().map(prediction_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn mark_evaluated(
        &self,
        prediction_id: Uuid,
        outcome: Outcome,
        score: Score,
    ) -> Result<bool, AppError> {
        let flags = OutcomeFlags::from(outcome.category);
        let result = sqlx::query(
            "UPDATE predictions SET status = 'evaluated', points = $2, \
             is_exact = $3, is_correct_diff = $4, is_correct_winner_only = $5, is_wrong = $6, \
             evaluated_home = $7, evaluated_away = $8 \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(prediction_id)
        .bind(outcome.points)
        .bind(flags.exact)
        .bind(flags.correct_diff)
        .bind(flags.correct_winner_only)
        .bind(flags.wrong)
        .bind(goal_param(score.home)?)
        .bind(goal_param(score.away)?)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, prediction_id = %prediction_id, "Failed to mark prediction evaluated");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn reset_to_pending(&self, prediction_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE predictions SET status = 'pending', points = 0, \
             is_exact = FALSE, is_correct_diff = FALSE, is_correct_winner_only = FALSE, is_wrong = FALSE, \
             evaluated_home = NULL, evaluated_away = NULL \
             WHERE id = $1 AND status = 'evaluated'",
        )
        .bind(prediction_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, prediction_id = %prediction_id, "Failed to reset prediction");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(result.rows_affected() == 1)
    }
}
