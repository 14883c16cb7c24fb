use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, instrument};

use super::{ranking::RankRecalculator, LeaderboardError};

/// Configuration for the scheduled rank recomputation
#[derive(Debug, Clone)]
pub struct RankRecomputeConfig {
    /// How often every competition is re-ranked
    pub interval: Duration,
}

impl Default for RankRecomputeConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60), // hourly
        }
    }
}

/// Starts the background task that periodically re-ranks every competition
#[instrument(skip(recalculator))]
pub async fn start_rank_recompute_task(
    recalculator: Arc<RankRecalculator>,
    config: RankRecomputeConfig,
) {
    info!(
        interval_secs = config.interval.as_secs(),
        "Starting rank recomputation background task"
    );

    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match run_scheduled_recompute(&recalculator).await {
            Ok(ranked) => info!(competitions = ranked, "Scheduled rank recomputation completed"),
            Err(e) => error!(error = %e, "Scheduled rank recomputation failed"),
        }
    }
}

/// One scheduled pass; returns how many competitions were re-ranked
async fn run_scheduled_recompute(recalculator: &RankRecalculator) -> Result<usize, LeaderboardError> {
    let reports = recalculator.recompute_all().await?;
    Ok(reports.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::{InMemoryLeaderboardRepository, LeaderboardRepository};
    use uuid::Uuid;

    #[tokio::test]
    async fn scheduled_pass_ranks_all_competitions() {
        let repo = Arc::new(InMemoryLeaderboardRepository::new());
        let recalculator = RankRecalculator::new(repo.clone());
        let competition = Uuid::new_v4();
        let user = Uuid::new_v4();
        repo.ensure_entry(user, competition).await.unwrap();

        let ranked = run_scheduled_recompute(&recalculator).await.unwrap();
        assert_eq!(ranked, 1);

        let entry = repo.get_entry(user, competition).await.unwrap().unwrap();
        assert_eq!(entry.current_rank, Some(1));
    }

    #[tokio::test]
    async fn scheduled_pass_with_no_competitions() {
        let recalculator = RankRecalculator::new(Arc::new(InMemoryLeaderboardRepository::new()));
        assert_eq!(run_scheduled_recompute(&recalculator).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn background_task_runs_on_first_tick() {
        let repo = Arc::new(InMemoryLeaderboardRepository::new());
        let competition = Uuid::new_v4();
        let user = Uuid::new_v4();
        repo.ensure_entry(user, competition).await.unwrap();

        let recalculator = Arc::new(RankRecalculator::new(repo.clone()));
        let handle = tokio::spawn(start_rank_recompute_task(
            recalculator,
            RankRecomputeConfig {
                interval: Duration::from_secs(60),
            },
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        let entry = repo.get_entry(user, competition).await.unwrap().unwrap();
        assert_eq!(entry.current_rank, Some(1));
    }
}
