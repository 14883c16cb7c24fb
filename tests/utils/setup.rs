#![allow(dead_code)] // Test utilities may not all be used in every test

use std::sync::Arc;
use uuid::Uuid;

use puckpicks::{
    leaderboard::{LeaderboardAggregator, LeaderboardEntry, LeaderboardRepository, RankRecalculator},
    matches::{InMemoryMatchRepository, MatchStatus},
    predictions::{InMemoryPredictionRepository, PredictionRepository},
    MatchEvaluationCoordinator, MatchResult, Prediction,
};

use super::mocks::FlakyLeaderboardRepository;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub competition_id: Uuid,
    pub matches: Arc<InMemoryMatchRepository>,
    pub predictions: Arc<InMemoryPredictionRepository>,
    pub leaderboard: Arc<FlakyLeaderboardRepository>,
    pub coordinator: Arc<MatchEvaluationCoordinator>,
    pub recalculator: Arc<RankRecalculator>,
}

pub struct TestSetupBuilder {
    batch_size: Option<usize>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self { batch_size: None }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn build(self) -> TestSetup {
        let matches = Arc::new(InMemoryMatchRepository::new());
        let predictions = Arc::new(InMemoryPredictionRepository::new());
        let leaderboard = Arc::new(FlakyLeaderboardRepository::new());

        let mut coordinator = MatchEvaluationCoordinator::new(
            matches.clone(),
            predictions.clone(),
            LeaderboardAggregator::new(leaderboard.clone()),
        );
        if let Some(batch_size) = self.batch_size {
            coordinator = coordinator.with_batch_size(batch_size);
        }

        TestSetup {
            competition_id: Uuid::new_v4(),
            matches,
            predictions,
            recalculator: Arc::new(RankRecalculator::new(leaderboard.clone())),
            leaderboard,
            coordinator: Arc::new(coordinator),
        }
    }
}

// ============================================================================
// Seeding and Lookup Helpers
// ============================================================================

impl TestSetup {
    /// Store a finished match in the setup's competition
    pub async fn finished_match(&self, home: u32, away: u32) -> MatchResult {
        let m = MatchResult::scheduled(self.competition_id).finish(home, away);
        self.matches.save_match(m.clone()).await;
        m
    }

    /// Store an edited version of the match, as match management would
    pub async fn correct_score(&self, m: &MatchResult, home: u32, away: u32) -> MatchResult {
        let mut corrected = m.clone().finish(home, away);
        corrected.previously_evaluated = true;
        self.matches.save_match(corrected.clone()).await;
        corrected
    }

    pub async fn set_status(&self, m: &MatchResult, status: MatchStatus) -> MatchResult {
        let mut updated = m.clone();
        updated.status = status;
        self.matches.save_match(updated.clone()).await;
        updated
    }

    pub async fn predict(&self, user_id: Uuid, m: &MatchResult, home: u32, away: u32) -> Prediction {
        let prediction = Prediction::new(user_id, m.id, home, away);
        self.predictions.save_prediction(prediction.clone()).await;
        prediction
    }

    pub async fn prediction(&self, id: Uuid) -> Prediction {
        self.predictions
            .get_prediction(id)
            .await
            .unwrap()
            .expect("prediction exists")
    }

    pub async fn entry(&self, user_id: Uuid) -> Option<LeaderboardEntry> {
        self.leaderboard
            .get_entry(user_id, self.competition_id)
            .await
            .unwrap()
    }

    /// User ids in current rank order
    pub async fn ranked_users(&self) -> Vec<Uuid> {
        self.recalculator
            .standings(self.competition_id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.user_id)
            .collect()
    }
}
