use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, error, info, instrument, warn, Instrument, Span};
use uuid::Uuid;

use super::EvaluationError;
use crate::{
    leaderboard::{LeaderboardAggregator, Sign},
    matches::{MatchRepository, MatchResult},
    predictions::{Prediction, PredictionRepository, PredictionStatus},
    scoring::{classify_scores, Outcome, Score, ScoringError},
};

pub const DEFAULT_BATCH_SIZE: usize = 500;

/// What one evaluate/revert/reevaluate call did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub match_id: Uuid,
    /// False when the match no longer exists; nothing was touched
    pub found: bool,
    pub evaluated: usize,
    pub reverted: usize,
    pub skipped: usize,
}

impl EvaluationReport {
    fn new(match_id: Uuid) -> Self {
        Self {
            match_id,
            found: true,
            ..Self::default()
        }
    }

    fn not_found(match_id: Uuid) -> Self {
        Self {
            match_id,
            found: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Evaluate,
    Revert,
    Reevaluate,
}

/// Applies or undoes scoring for every prediction of a match.
///
/// Each prediction's status is the guard against double application: a
/// prediction is claimed (pending -> evaluated) before its delta is added, and
/// a failed delta releases the claim again. A failed call can therefore always
/// be retried as a whole.
#[derive(Clone)]
pub struct MatchEvaluationCoordinator {
    matches: Arc<dyn MatchRepository>,
    predictions: Arc<dyn PredictionRepository>,
    aggregator: LeaderboardAggregator,
    batch_size: usize,
    match_locks: Arc<RwLock<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
}

impl MatchEvaluationCoordinator {
    pub fn new(
        matches: Arc<dyn MatchRepository>,
        predictions: Arc<dyn PredictionRepository>,
        aggregator: LeaderboardAggregator,
    ) -> Self {
        Self {
            matches,
            predictions,
            aggregator,
            batch_size: DEFAULT_BATCH_SIZE,
            match_locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Scores every prediction of a finished match that is not already scored
    /// against its current final score.
    #[instrument(skip(self))]
    pub async fn evaluate(&self, match_id: Uuid) -> Result<EvaluationReport, EvaluationError> {
        self.run_detached(match_id, Operation::Evaluate).await
    }

    /// Undoes every evaluated prediction of a match. Safe on a match that was
    /// never evaluated.
    #[instrument(skip(self))]
    pub async fn revert(&self, match_id: Uuid) -> Result<EvaluationReport, EvaluationError> {
        self.run_detached(match_id, Operation::Revert).await
    }

    /// Full re-evaluation: revert then evaluate without releasing the match
    #[instrument(skip(self))]
    pub async fn reevaluate(&self, match_id: Uuid) -> Result<EvaluationReport, EvaluationError> {
        self.run_detached(match_id, Operation::Reevaluate).await
    }

    /// Runs the operation on its own task under the match lock. The task
    /// outlives a dropped caller, so a prediction is never left between its
    /// status write and its leaderboard write.
    async fn run_detached(
        &self,
        match_id: Uuid,
        operation: Operation,
    ) -> Result<EvaluationReport, EvaluationError> {
        let coordinator = self.clone();
        let task = tokio::spawn(
            async move {
                let lock = coordinator.match_lock(match_id).await;
                let guard = lock.lock().await;
                let result = match operation {
                    Operation::Evaluate => coordinator.evaluate_locked(match_id).await,
                    Operation::Revert => coordinator.revert_locked(match_id).await,
                    Operation::Reevaluate => coordinator.reevaluate_locked(match_id).await,
                };
                drop(guard);
                coordinator.release_match_lock(match_id, lock).await;
                result
            }
            .instrument(Span::current()),
        );

        task.await.map_err(|e| {
            error!(match_id = %match_id, ?operation, error = %e, "Evaluation task did not complete");
            EvaluationError::TaskFailed {
                match_id,
                reason: e.to_string(),
            }
        })?
    }

    async fn reevaluate_locked(&self, match_id: Uuid) -> Result<EvaluationReport, EvaluationError> {
        let reverted = self.revert_locked(match_id).await?;
        if !reverted.found {
            return Ok(reverted);
        }
        let mut report = self.evaluate_locked(match_id).await?;
        report.reverted += reverted.reverted;
        Ok(report)
    }

    async fn evaluate_locked(&self, match_id: Uuid) -> Result<EvaluationReport, EvaluationError> {
        let Some(m) = self.matches.get_match(match_id).await? else {
            info!(match_id = %match_id, "Match not found, nothing to evaluate");
            return Ok(EvaluationReport::not_found(match_id));
        };
        let score = evaluable_score(&m)?;

        info!(
            match_id = %match_id,
            competition_id = %m.competition_id,
            score = %score,
            ending = %m.ending,
            "Evaluating match predictions"
        );

        let mut report = EvaluationReport::new(match_id);
        let mut cursor = None;
        loop {
            let page = self
                .predictions
                .list_for_match(match_id, cursor, self.batch_size)
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = Some(last.id);

            for prediction in &page {
                match prediction.status {
                    PredictionStatus::Void => report.skipped += 1,
                    PredictionStatus::Evaluated if prediction.is_evaluated_against(score) => {
                        report.skipped += 1
                    }
                    PredictionStatus::Evaluated => {
                        // Scored against an older final score.
                        if self.revert_prediction(&m, prediction).await? {
                            report.reverted += 1;
                        }
                        if self.evaluate_prediction(&m, prediction, score).await? {
                            report.evaluated += 1;
                        }
                    }
                    PredictionStatus::Pending => {
                        if self.evaluate_prediction(&m, prediction, score).await? {
                            report.evaluated += 1;
                        } else {
                            report.skipped += 1;
                        }
                    }
                }
            }

            if page.len() < self.batch_size {
                break;
            }
            tokio::task::yield_now().await;
        }

        info!(
            match_id = %match_id,
            evaluated = report.evaluated,
            reverted = report.reverted,
            skipped = report.skipped,
            "Match evaluation completed"
        );
        Ok(report)
    }

    async fn revert_locked(&self, match_id: Uuid) -> Result<EvaluationReport, EvaluationError> {
        let Some(m) = self.matches.get_match(match_id).await? else {
            info!(match_id = %match_id, "Match not found, nothing to revert");
            return Ok(EvaluationReport::not_found(match_id));
        };

        let mut report = EvaluationReport::new(match_id);
        let mut cursor = None;
        loop {
            let page = self
                .predictions
                .list_for_match(match_id, cursor, self.batch_size)
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = Some(last.id);

            for prediction in &page {
                if prediction.status == PredictionStatus::Evaluated
                    && self.revert_prediction(&m, prediction).await?
                {
                    report.reverted += 1;
                } else {
                    report.skipped += 1;
                }
            }

            if page.len() < self.batch_size {
                break;
            }
            tokio::task::yield_now().await;
        }

        info!(
            match_id = %match_id,
            reverted = report.reverted,
            "Match evaluation reverted"
        );
        Ok(report)
    }

    /// Claims a pending prediction, then adds its contribution. Returns false
    /// if the prediction was no longer pending.
    async fn evaluate_prediction(
        &self,
        m: &MatchResult,
        prediction: &Prediction,
        score: Score,
    ) -> Result<bool, EvaluationError> {
        let outcome = classify_scores(prediction.predicted_score(), score)
            .map_err(|e| scoring_error(m.id, e))?;

        if !self
            .predictions
            .mark_evaluated(prediction.id, outcome, score)
            .await?
        {
            debug!(prediction_id = %prediction.id, "Prediction no longer pending, skipping");
            return Ok(false);
        }

        if let Err(e) = self
            .aggregator
            .apply_outcome(prediction.user_id, m.competition_id, outcome, Sign::Apply)
            .await
        {
            error!(
                match_id = %m.id,
                prediction_id = %prediction.id,
                user_id = %prediction.user_id,
                error = %e,
                "Failed to add prediction to leaderboard, releasing claim"
            );
            if let Err(release) = self.predictions.reset_to_pending(prediction.id).await {
                error!(
                    prediction_id = %prediction.id,
                    error = %release,
                    "Failed to release prediction claim"
                );
            }
            return Err(e.into());
        }

        debug!(
            match_id = %m.id,
            prediction_id = %prediction.id,
            user_id = %prediction.user_id,
            category = %outcome.category,
            points = outcome.points,
            "Prediction evaluated"
        );
        Ok(true)
    }

    /// Removes an evaluated prediction's contribution, then resets it to
    /// pending. Returns false if it was no longer evaluated.
    async fn revert_prediction(
        &self,
        m: &MatchResult,
        prediction: &Prediction,
    ) -> Result<bool, EvaluationError> {
        let Some(outcome) = prediction.applied_outcome() else {
            error!(
                match_id = %m.id,
                prediction_id = %prediction.id,
                "Evaluated prediction has no single outcome flag"
            );
            return Err(EvaluationError::invalid_state(
                m.id,
                format!("prediction {} has inconsistent outcome flags", prediction.id),
            ));
        };

        let entry = self
            .aggregator
            .apply_outcome(prediction.user_id, m.competition_id, outcome, Sign::Undo)
            .await?;
        if entry.has_negative_totals() {
            error!(
                match_id = %m.id,
                prediction_id = %prediction.id,
                user_id = %prediction.user_id,
                category = %outcome.category,
                "Reverting prediction left a negative leaderboard entry"
            );
        }

        let reset = match self.predictions.reset_to_pending(prediction.id).await {
            Ok(reset) => reset,
            Err(e) => {
                self.restore_contribution(m, prediction, outcome).await;
                return Err(e.into());
            }
        };
        if !reset {
            warn!(prediction_id = %prediction.id, "Prediction changed during revert");
            self.restore_contribution(m, prediction, outcome).await;
            return Ok(false);
        }

        debug!(
            match_id = %m.id,
            prediction_id = %prediction.id,
            user_id = %prediction.user_id,
            "Prediction reverted"
        );
        Ok(true)
    }

    async fn restore_contribution(
        &self,
        m: &MatchResult,
        prediction: &Prediction,
        outcome: Outcome,
    ) {
        if let Err(e) = self
            .aggregator
            .apply_outcome(prediction.user_id, m.competition_id, outcome, Sign::Apply)
            .await
        {
            error!(
                match_id = %m.id,
                prediction_id = %prediction.id,
                user_id = %prediction.user_id,
                error = %e,
                "Failed to restore leaderboard contribution"
            );
        }
    }

    async fn match_lock(&self, match_id: Uuid) -> Arc<AsyncMutex<()>> {
        {
            let guard = self.match_locks.read().await;
            if let Some(lock) = guard.get(&match_id) {
                return lock.clone();
            }
        }

        let mut guard = self.match_locks.write().await;
        guard
            .entry(match_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Drops the lock entry once no other caller holds a handle to it
    async fn release_match_lock(&self, match_id: Uuid, lock: Arc<AsyncMutex<()>>) {
        let mut guard = self.match_locks.write().await;
        if let Some(current) = guard.get(&match_id) {
            // One reference in the map, one held here.
            if Arc::ptr_eq(current, &lock) && Arc::strong_count(&lock) == 2 {
                guard.remove(&match_id);
            }
        }
    }

    #[cfg(test)]
    async fn tracked_locks(&self) -> usize {
        self.match_locks.read().await.len()
    }
}

/// The score to evaluate against, or why the match cannot be evaluated
fn evaluable_score(m: &MatchResult) -> Result<Score, EvaluationError> {
    if !m.is_finished() {
        warn!(match_id = %m.id, status = %m.status, "Refusing to evaluate unfinished match");
        return Err(EvaluationError::invalid_state(
            m.id,
            format!("match status is {}", m.status),
        ));
    }
    let Some(score) = m.final_score() else {
        warn!(match_id = %m.id, "Refusing to evaluate match without a recorded score");
        return Err(EvaluationError::invalid_state(m.id, "no final score recorded"));
    };
    if score.goal_difference() == 0 {
        warn!(match_id = %m.id, score = %score, "Refusing to evaluate tied final score");
        return Err(EvaluationError::AmbiguousResult {
            match_id: m.id,
            home: score.home,
            away: score.away,
        });
    }
    Ok(score)
}

fn scoring_error(match_id: Uuid, err: ScoringError) -> EvaluationError {
    match err {
        ScoringError::AmbiguousResult { home, away } => {
            EvaluationError::AmbiguousResult { match_id, home, away }
        }
    }
}
