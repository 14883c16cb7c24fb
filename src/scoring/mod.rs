// Pure prediction scoring
//
// Classifies a guessed score against a final score. Nothing in here performs
// I/O; the evaluation coordinator decides when and what to score.

pub use calculator::{classify, classify_scores};
pub use errors::ScoringError;
pub use models::{Category, Outcome, OutcomeFlags, Score};

mod calculator;
mod errors;
mod models;

/// Point values awarded per category
pub mod points {
    pub const EXACT: i32 = 5;
    pub const CORRECT_DIFF: i32 = 3;
    pub const CORRECT_WINNER_ONLY: i32 = 2;
    pub const WRONG: i32 = 0;
}
