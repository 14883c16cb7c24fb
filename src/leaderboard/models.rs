use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::scoring::{Category, Outcome};

/// Running totals for one user in one competition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Creation sequence, also the final ranking tiebreak
    pub id: i64,
    pub user_id: Uuid,
    pub competition_id: Uuid,
    pub total_points: i64,
    /// Number of evaluated predictions
    pub total_matches: i64,
    pub exact_count: i64,
    pub correct_diff_count: i64,
    pub correct_winner_count: i64,
    pub wrong_count: i64,
    pub current_rank: Option<u32>,
    pub previous_rank: Option<u32>,
    /// previous_rank - current_rank; positive means the user moved up
    pub rank_change: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeaderboardEntry {
    pub fn zeroed(id: i64, user_id: Uuid, competition_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            competition_id,
            total_points: 0,
            total_matches: 0,
            exact_count: 0,
            correct_diff_count: 0,
            correct_winner_count: 0,
            wrong_count: 0,
            current_rank: None,
            previous_rank: None,
            rank_change: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn category_count(&self, category: Category) -> i64 {
        match category {
            Category::Exact => self.exact_count,
            Category::CorrectDiff => self.correct_diff_count,
            Category::CorrectWinnerOnly => self.correct_winner_count,
            Category::Wrong => self.wrong_count,
        }
    }

    /// True when an undo removed more than was ever applied
    pub fn has_negative_totals(&self) -> bool {
        self.total_points < 0
            || self.total_matches < 0
            || self.exact_count < 0
            || self.correct_diff_count < 0
            || self.correct_winner_count < 0
            || self.wrong_count < 0
    }

    /// Folds one delta into the running totals
    pub fn apply(&mut self, delta: &AggregateDelta) {
        let sign = delta.sign.factor();
        self.total_points += sign * i64::from(delta.points);
        self.total_matches += sign;
        let counter = match delta.category {
            Category::Exact => &mut self.exact_count,
            Category::CorrectDiff => &mut self.correct_diff_count,
            Category::CorrectWinnerOnly => &mut self.correct_winner_count,
            Category::Wrong => &mut self.wrong_count,
        };
        *counter += sign;
        self.updated_at = Utc::now();
    }
}

/// Whether a delta adds or removes a prediction's contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sign {
    Apply,
    Undo,
}

impl Sign {
    pub fn factor(self) -> i64 {
        match self {
            Sign::Apply => 1,
            Sign::Undo => -1,
        }
    }
}

/// One prediction's contribution to a leaderboard entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateDelta {
    pub user_id: Uuid,
    pub competition_id: Uuid,
    pub category: Category,
    pub points: i32,
    pub sign: Sign,
}

impl AggregateDelta {
    pub fn new(user_id: Uuid, competition_id: Uuid, outcome: Outcome, sign: Sign) -> Self {
        Self {
            user_id,
            competition_id,
            category: outcome.category,
            points: outcome.points,
            sign,
        }
    }

    /// Signed change to total_points
    pub fn points_delta(&self) -> i64 {
        self.sign.factor() * i64::from(self.points)
    }

    /// Signed change to the given category counter
    pub fn count_delta(&self, category: Category) -> i64 {
        if self.category == category {
            self.sign.factor()
        } else {
            0
        }
    }
}

/// Rank fields computed for one entry by a recomputation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankUpdate {
    pub entry_id: i64,
    pub user_id: Uuid,
    pub current_rank: u32,
    pub previous_rank: Option<u32>,
    pub rank_change: i32,
}

/// Ranks as of one recomputation, the baseline for the next one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankSnapshot {
    pub competition_id: Uuid,
    pub taken_at: DateTime<Utc>,
    pub ranks: HashMap<Uuid, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingReport {
    pub competition_id: Uuid,
    pub ranked: usize,
    pub moved_up: usize,
    pub moved_down: usize,
    pub unchanged: usize,
    pub taken_at: Option<DateTime<Utc>>,
}
