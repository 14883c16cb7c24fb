use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use super::points;

/// Classification of a prediction against the final score
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    Exact,
    CorrectDiff,
    CorrectWinnerOnly,
    Wrong,
}

impl Category {
    /// Points awarded for landing in this category
    pub fn points(self) -> i32 {
        match self {
            Category::Exact => points::EXACT,
            Category::CorrectDiff => points::CORRECT_DIFF,
            Category::CorrectWinnerOnly => points::CORRECT_WINNER_ONLY,
            Category::Wrong => points::WRONG,
        }
    }
}

/// Result of scoring a single prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub category: Category,
    pub points: i32,
}

impl Outcome {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            points: category.points(),
        }
    }
}

/// A home/away goal pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }

    pub fn goal_difference(&self) -> i64 {
        i64::from(self.home) - i64::from(self.away)
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.home, self.away)
    }
}

/// The four mutually exclusive outcome flags stored on a prediction.
/// All false means the prediction has not been scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeFlags {
    pub exact: bool,
    pub correct_diff: bool,
    pub correct_winner_only: bool,
    pub wrong: bool,
}

impl OutcomeFlags {
    pub fn cleared() -> Self {
        Self::default()
    }

    /// The category these flags encode, if exactly one is set
    pub fn category(&self) -> Option<Category> {
        match (self.exact, self.correct_diff, self.correct_winner_only, self.wrong) {
            (true, false, false, false) => Some(Category::Exact),
            (false, true, false, false) => Some(Category::CorrectDiff),
            (false, false, true, false) => Some(Category::CorrectWinnerOnly),
            (false, false, false, true) => Some(Category::Wrong),
            _ => None,
        }
    }
}

impl From<Category> for OutcomeFlags {
    fn from(category: Category) -> Self {
        Self {
            exact: category == Category::Exact,
            correct_diff: category == Category::CorrectDiff,
            correct_winner_only: category == Category::CorrectWinnerOnly,
            wrong: category == Category::Wrong,
        }
    }
}
