//! Test assertion helpers - fluent API for verifying leaderboard state
#![allow(dead_code)] // Test utilities may not all be used in every test

use uuid::Uuid;

use puckpicks::{leaderboard::LeaderboardEntry, Category};

use super::setup::TestSetup;

// ============================================================================
// Assertion Helpers
// ============================================================================

pub struct EntryAssertion {
    entry: LeaderboardEntry,
}

impl EntryAssertion {
    /// Load the user's entry, failing the test if it does not exist
    pub async fn for_user(setup: &TestSetup, user_id: Uuid) -> Self {
        let entry = setup.entry(user_id).await;
        assert!(entry.is_some(), "Expected a leaderboard entry for {user_id}");
        Self {
            entry: entry.unwrap(),
        }
    }

    pub fn has_points(self, expected: i64) -> Self {
        assert_eq!(
            self.entry.total_points, expected,
            "Unexpected total_points for {}",
            self.entry.user_id
        );
        self
    }

    pub fn has_matches(self, expected: i64) -> Self {
        assert_eq!(
            self.entry.total_matches, expected,
            "Unexpected total_matches for {}",
            self.entry.user_id
        );
        self
    }

    pub fn has_count(self, category: Category, expected: i64) -> Self {
        assert_eq!(
            self.entry.category_count(category),
            expected,
            "Unexpected {category} count for {}",
            self.entry.user_id
        );
        self
    }

    /// Totals match the sum of the category counters
    pub fn is_consistent(self) -> Self {
        let e = &self.entry;
        assert_eq!(
            e.total_matches,
            e.exact_count + e.correct_diff_count + e.correct_winner_count + e.wrong_count,
            "total_matches does not equal the category counts"
        );
        assert_eq!(
            e.total_points,
            e.exact_count * 5 + e.correct_diff_count * 3 + e.correct_winner_count * 2,
            "total_points does not match the category counts"
        );
        self
    }

    pub fn is_empty(self) -> Self {
        self.has_points(0).has_matches(0).is_consistent()
    }

    pub fn has_rank(self, current: Option<u32>, previous: Option<u32>, change: i32) -> Self {
        assert_eq!(self.entry.current_rank, current, "Unexpected current_rank");
        assert_eq!(self.entry.previous_rank, previous, "Unexpected previous_rank");
        assert_eq!(self.entry.rank_change, change, "Unexpected rank_change");
        self
    }
}
