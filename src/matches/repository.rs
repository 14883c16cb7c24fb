use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::models::{MatchResult, MatchStatus};
use crate::shared::AppError;

/// Read access to matches. Matches are written by the match-management side;
/// the engine only ever reads them.
#[async_trait]
pub trait MatchRepository: Send + Sync {
    async fn get_match(&self, match_id: Uuid) -> Result<Option<MatchResult>, AppError>;
}

/// In-memory implementation of MatchRepository for development and testing
#[derive(Debug, Default)]
pub struct InMemoryMatchRepository {
    matches: RwLock<HashMap<Uuid, MatchResult>>,
}

impl InMemoryMatchRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or replaces a match, standing in for the match-management side
    pub async fn save_match(&self, m: MatchResult) {
        self.matches.write().await.insert(m.id, m);
    }
}

#[async_trait]
impl MatchRepository for InMemoryMatchRepository {
    #[instrument(skip(self))]
    async fn get_match(&self, match_id: Uuid) -> Result<Option<MatchResult>, AppError> {
        let found = self.matches.read().await.get(&match_id).cloned();
        if found.is_none() {
            debug!(match_id = %match_id, "Match not found in memory");
        }
        Ok(found)
    }
}

/// PostgreSQL implementation of match repository
pub struct PostgresMatchRepository {
    pool: PgPool,
}

impl PostgresMatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MatchRepository for PostgresMatchRepository {
    #[instrument(skip(self))]
    async fn get_match(&self, match_id: Uuid) -> Result<Option<MatchResult>, AppError> {
        debug!(match_id = %match_id, "Fetching match from database");

        let row = sqlx::query(
            "SELECT id, competition_id, home_score, away_score, ending, status, previously_evaluated FROM matches WHERE id = $1",
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, match_id = %match_id, "Failed to fetch match from database");
            AppError::DatabaseError(e.to_string())
        })?;

        let Some(row) = row else {
            debug!(match_id = %match_id, "Match not found in database");
            return Ok(None);
        };

        let home_score: Option<i32> = row.get("home_score");
        let away_score: Option<i32> = row.get("away_score");
        let ending: String = row.get("ending");
        let status: String = row.get("status");

        Ok(Some(MatchResult {
            id: row.get("id"),
            competition_id: row.get("competition_id"),
            home_score: home_score.map(goal_count).transpose()?,
            away_score: away_score.map(goal_count).transpose()?,
            ending: ending
                .parse()
                .map_err(|_| AppError::DatabaseError(format!("Unknown ending type: {ending}")))?,
            status: status
                .parse::<MatchStatus>()
                .map_err(|_| AppError::DatabaseError(format!("Unknown match status: {status}")))?,
            previously_evaluated: row.get("previously_evaluated"),
        }))
    }
}

pub(crate) fn goal_count(value: i32) -> Result<u32, AppError> {
    u32::try_from(value).map_err(|_| AppError::DatabaseError(format!("Negative goal count: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_and_fetches_match() {
        let repo = InMemoryMatchRepository::new();
        let m = MatchResult::scheduled(Uuid::new_v4()).finish(4, 2);
        repo.save_match(m.clone()).await;

        let fetched = repo.get_match(m.id).await.unwrap();
        assert_eq!(fetched, Some(m));
    }

    #[tokio::test]
    async fn missing_match_is_none() {
        let repo = InMemoryMatchRepository::new();
        assert!(repo.get_match(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[test]
    fn negative_goal_count_is_rejected() {
        assert!(matches!(goal_count(-1), Err(AppError::DatabaseError(_))));
        assert_eq!(goal_count(3).unwrap(), 3);
    }
}
