use chrono::Utc;
use futures::future::join_all;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::{
    models::{LeaderboardEntry, RankSnapshot, RankUpdate, RankingReport},
    repository::LeaderboardRepository,
    LeaderboardError,
};

/// Leaderboard order: most points first, then fewest evaluated predictions,
/// then earliest entry.
pub fn ranking_order(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    b.total_points
        .cmp(&a.total_points)
        .then_with(|| a.total_matches.cmp(&b.total_matches))
        .then_with(|| a.id.cmp(&b.id))
}

/// Rewrites the rank fields of every entry in a competition
#[derive(Clone)]
pub struct RankRecalculator {
    repository: Arc<dyn LeaderboardRepository>,
}

impl RankRecalculator {
    pub fn new(repository: Arc<dyn LeaderboardRepository>) -> Self {
        Self { repository }
    }

    /// Sorts the competition's entries and commits new ranks plus a snapshot.
    ///
    /// The whole ordering is built in memory before anything is written, and
    /// the commit is all-or-nothing. Entries that change while this runs are
    /// picked up by the next run.
    #[instrument(skip(self))]
    pub async fn recompute(&self, competition_id: Uuid) -> Result<RankingReport, LeaderboardError> {
        let mut entries = self.repository.list_entries(competition_id).await?;
        if entries.is_empty() {
            info!(competition_id = %competition_id, "No leaderboard entries to rank");
            return Ok(RankingReport {
                competition_id,
                ranked: 0,
                moved_up: 0,
                moved_down: 0,
                unchanged: 0,
                taken_at: None,
            });
        }

        let previous_ranks = self
            .repository
            .latest_snapshot(competition_id)
            .await?
            .map(|snapshot| snapshot.ranks)
            .unwrap_or_default();

        entries.sort_by(ranking_order);
        let updates = assign_ranks(&entries, &previous_ranks);

        let snapshot = RankSnapshot {
            competition_id,
            taken_at: Utc::now(),
            ranks: updates
                .iter()
                .map(|u| (u.user_id, u.current_rank))
                .collect(),
        };

        self.repository
            .commit_rankings(competition_id, &updates, &snapshot)
            .await
            .map_err(|e| {
                error!(competition_id = %competition_id, error = %e, "Failed to commit rankings");
                LeaderboardError::from(e)
            })?;

        let report = RankingReport {
            competition_id,
            ranked: updates.len(),
            moved_up: updates.iter().filter(|u| u.rank_change > 0).count(),
            moved_down: updates.iter().filter(|u| u.rank_change < 0).count(),
            unchanged: updates.iter().filter(|u| u.rank_change == 0).count(),
            taken_at: Some(snapshot.taken_at),
        };

        info!(
            competition_id = %competition_id,
            ranked = report.ranked,
            moved_up = report.moved_up,
            moved_down = report.moved_down,
            "Leaderboard ranks recomputed"
        );
        Ok(report)
    }

    /// Recomputes every competition that has entries. A failing competition
    /// is logged and skipped.
    #[instrument(skip(self))]
    pub async fn recompute_all(&self) -> Result<Vec<RankingReport>, LeaderboardError> {
        let competitions = self.repository.list_competitions().await?;

        let results = join_all(competitions.iter().map(|c| self.recompute(*c))).await;

        let mut reports = Vec::with_capacity(results.len());
        for (competition_id, result) in competitions.iter().zip(results) {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(competition_id = %competition_id, error = %e, "Rank recomputation failed");
                }
            }
        }
        Ok(reports)
    }

    /// Entries in display order: ranked entries by rank, then any entry that
    /// joined after the last recomputation in leaderboard order
    pub async fn standings(
        &self,
        competition_id: Uuid,
    ) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let mut entries = self.repository.list_entries(competition_id).await?;
        entries.sort_by(|a, b| match (a.current_rank, b.current_rank) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| ranking_order(a, b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => ranking_order(a, b),
        });
        Ok(entries)
    }
}

/// Assigns 1-based consecutive ranks to already sorted entries. The previous
/// rank comes from the last snapshot, falling back to the rank stored on the
/// entry; entries with neither get a zero change.
fn assign_ranks(sorted: &[LeaderboardEntry], previous_ranks: &HashMap<Uuid, u32>) -> Vec<RankUpdate> {
    sorted
        .iter()
        .zip(1u32..)
        .map(|(entry, rank)| {
            let previous_rank = previous_ranks
                .get(&entry.user_id)
                .copied()
                .or(entry.current_rank);
            let rank_change = previous_rank
                .map(|previous| i64::from(previous) - i64::from(rank))
                .map_or(0, |change| change.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32);
            RankUpdate {
                entry_id: entry.id,
                user_id: entry.user_id,
                current_rank: rank,
                previous_rank,
                rank_change,
            }
        })
        .collect()
}
