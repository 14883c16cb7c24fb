// Per-user, per-competition aggregates and their rank ordering

pub mod aggregator;
mod errors;
pub mod handlers;
pub mod models;
pub mod ranking;
pub mod repository;
pub mod task;
pub mod types;

pub use aggregator::LeaderboardAggregator;
pub use errors::LeaderboardError;
pub use models::*;
pub use ranking::{ranking_order, RankRecalculator};
pub use repository::{
    InMemoryLeaderboardRepository, LeaderboardRepository, PostgresLeaderboardRepository,
};
pub use handlers::{get_standings, recompute_competition};
pub use task::{start_rank_recompute_task, RankRecomputeConfig};
pub use types::StandingResponse;
