// Library crate for the puckpicks scoring engine
// This file exposes the public API for integration tests

pub mod auth;
pub mod config;
pub mod evaluation;
pub mod leaderboard;
pub mod matches;
pub mod predictions;
pub mod routes;
pub mod scoring;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use evaluation::{EvaluationError, EvaluationReport, MatchEvaluationCoordinator, MatchEvent};
pub use leaderboard::{LeaderboardAggregator, LeaderboardEntry, RankRecalculator};
pub use matches::MatchResult;
pub use predictions::Prediction;
pub use routes::router;
pub use scoring::{classify, Category, Outcome, Score};
pub use shared::{AppError, AppState};
