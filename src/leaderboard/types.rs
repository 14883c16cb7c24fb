use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::models::LeaderboardEntry;

/// One row of a competition leaderboard
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StandingResponse {
    pub rank: Option<u32>,
    pub previous_rank: Option<u32>,
    pub rank_change: i32,
    pub user_id: Uuid,
    pub total_points: i64,
    pub total_matches: i64,
    pub exact_count: i64,
    pub correct_diff_count: i64,
    pub correct_winner_count: i64,
    pub wrong_count: i64,
}

impl From<LeaderboardEntry> for StandingResponse {
    fn from(entry: LeaderboardEntry) -> Self {
        Self {
            rank: entry.current_rank,
            previous_rank: entry.previous_rank,
            rank_change: entry.rank_change,
            user_id: entry.user_id,
            total_points: entry.total_points,
            total_matches: entry.total_matches,
            exact_count: entry.exact_count,
            correct_diff_count: entry.correct_diff_count,
            correct_winner_count: entry.correct_winner_count,
            wrong_count: entry.wrong_count,
        }
    }
}
