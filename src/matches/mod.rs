// Read contract for finished match results owned by the match-management side

pub mod models;
pub mod repository;

pub use models::{EndingType, MatchResult, MatchStatus};
pub use repository::{InMemoryMatchRepository, MatchRepository, PostgresMatchRepository};
