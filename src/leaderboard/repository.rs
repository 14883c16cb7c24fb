use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::models::{AggregateDelta, LeaderboardEntry, RankSnapshot, RankUpdate};
use crate::scoring::Category;
use crate::shared::AppError;

/// Storage for leaderboard entries and rank snapshots.
///
/// `apply_delta` must be atomic per entry: concurrent deltas for the same
/// (user, competition) never lose an update. `commit_rankings` writes every
/// rank update and the snapshot together or not at all.
#[async_trait]
pub trait LeaderboardRepository: Send + Sync {
    /// Returns the entry, creating a zeroed one if the user has none yet
    async fn ensure_entry(
        &self,
        user_id: Uuid,
        competition_id: Uuid,
    ) -> Result<LeaderboardEntry, AppError>;

    /// Atomically folds the delta into the entry, creating it zeroed first if missing
    async fn apply_delta(&self, delta: &AggregateDelta) -> Result<LeaderboardEntry, AppError>;

    async fn get_entry(
        &self,
        user_id: Uuid,
        competition_id: Uuid,
    ) -> Result<Option<LeaderboardEntry>, AppError>;

    async fn list_entries(&self, competition_id: Uuid) -> Result<Vec<LeaderboardEntry>, AppError>;

    /// Every competition with at least one entry
    async fn list_competitions(&self) -> Result<Vec<Uuid>, AppError>;

    async fn latest_snapshot(&self, competition_id: Uuid)
        -> Result<Option<RankSnapshot>, AppError>;

    async fn commit_rankings(
        &self,
        competition_id: Uuid,
        updates: &[RankUpdate],
        snapshot: &RankSnapshot,
    ) -> Result<(), AppError>;
}

/// Rank snapshots kept per competition by the in-memory store
pub const SNAPSHOT_HISTORY_LIMIT: usize = 24;

#[derive(Debug, Default)]
struct LeaderboardState {
    entries: HashMap<(Uuid, Uuid), LeaderboardEntry>,
    next_entry_id: i64,
    snapshots: HashMap<Uuid, Vec<RankSnapshot>>,
}

impl LeaderboardState {
    fn entry_mut(&mut self, user_id: Uuid, competition_id: Uuid) -> &mut LeaderboardEntry {
        let next_id = &mut self.next_entry_id;
        self.entries
            .entry((user_id, competition_id))
            .or_insert_with(|| {
                *next_id += 1;
                debug!(user_id = %user_id, competition_id = %competition_id, "Creating zeroed leaderboard entry");
                LeaderboardEntry::zeroed(*next_id, user_id, competition_id)
            })
    }
}

/// In-memory implementation of LeaderboardRepository for development and testing.
/// A single write lock covers each operation, which makes every delta atomic.
#[derive(Debug, Default)]
pub struct InMemoryLeaderboardRepository {
    state: RwLock<LeaderboardState>,
}

impl InMemoryLeaderboardRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot_count(&self, competition_id: Uuid) -> usize {
        self.state
            .read()
            .await
            .snapshots
            .get(&competition_id)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl LeaderboardRepository for InMemoryLeaderboardRepository {
    #[instrument(skip(self))]
    async fn ensure_entry(
        &self,
        user_id: Uuid,
        competition_id: Uuid,
    ) -> Result<LeaderboardEntry, AppError> {
        let mut state = self.state.write().await;
        Ok(state.entry_mut(user_id, competition_id).clone())
    }

    #[instrument(skip(self))]
    async fn apply_delta(&self, delta: &AggregateDelta) -> Result<LeaderboardEntry, AppError> {
        let mut state = self.state.write().await;
        let entry = state.entry_mut(delta.user_id, delta.competition_id);
        entry.apply(delta);
        Ok(entry.clone())
    }

    async fn get_entry(
        &self,
        user_id: Uuid,
        competition_id: Uuid,
    ) -> Result<Option<LeaderboardEntry>, AppError> {
        let state = self.state.read().await;
        Ok(state.entries.get(&(user_id, competition_id)).cloned())
    }

    async fn list_entries(&self, competition_id: Uuid) -> Result<Vec<LeaderboardEntry>, AppError> {
        let state = self.state.read().await;
        let mut entries: Vec<LeaderboardEntry> = state
            .entries
            .values()
            .filter(|e| e.competition_id == competition_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.id);
        Ok(entries)
    }

    async fn list_competitions(&self) -> Result<Vec<Uuid>, AppError> {
        let state = self.state.read().await;
        let competitions: BTreeSet<Uuid> =
            state.entries.values().map(|e| e.competition_id).collect();
        Ok(competitions.into_iter().collect())
    }

    async fn latest_snapshot(
        &self,
        competition_id: Uuid,
    ) -> Result<Option<RankSnapshot>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .snapshots
            .get(&competition_id)
            .and_then(|runs| runs.last())
            .cloned())
    }

    #[instrument(skip(self, updates, snapshot))]
    async fn commit_rankings(
        &self,
        competition_id: Uuid,
        updates: &[RankUpdate],
        snapshot: &RankSnapshot,
    ) -> Result<(), AppError> {
        let mut state = self.state.write().await;

        // Validate everything before touching any entry.
        let mut keyed = Vec::with_capacity(updates.len());
        for update in updates {
            match state.entries.get(&(update.user_id, competition_id)) {
                Some(entry) if entry.id == update.entry_id => {
                    keyed.push(((update.user_id, competition_id), *update))
                }
                _ => {
                    warn!(
                        competition_id = %competition_id,
                        entry_id = update.entry_id,
                        "Rank update references an unknown entry"
                    );
                    return Err(AppError::DatabaseError(format!(
                        "Unknown leaderboard entry {}",
                        update.entry_id
                    )));
                }
            }
        }

        for (key, update) in keyed {
            if let Some(entry) = state.entries.get_mut(&key) {
                entry.current_rank = Some(update.current_rank);
                entry.previous_rank = update.previous_rank;
                entry.rank_change = update.rank_change;
            }
        }

        let history = state.snapshots.entry(competition_id).or_default();
        history.push(snapshot.clone());
        if history.len() > SNAPSHOT_HISTORY_LIMIT {
            let excess = history.len() - SNAPSHOT_HISTORY_LIMIT;
            history.drain(..excess);
        }

        debug!(competition_id = %competition_id, ranked = updates.len(), "Committed rankings in memory");
        Ok(())
    }
}

/// PostgreSQL implementation of leaderboard repository
pub struct PostgresLeaderboardRepository {
    pool: PgPool,
}

impl PostgresLeaderboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ENTRY_COLUMNS: &str = "id, user_id, competition_id, total_points, total_matches, \
     exact_count, correct_diff_count, correct_winner_count, wrong_count, \
     current_rank, previous_rank, rank_change, created_at, updated_at";

fn rank_from_db(value: Option<i32>) -> Result<Option<u32>, AppError> {
    value
        .map(|rank| {
            u32::try_from(rank).map_err(|_| AppError::DatabaseError(format!("Invalid rank: {rank}")))
        })
        .transpose()
}

fn rank_to_db(rank: u32) -> Result<i32, AppError> {
    i32::try_from(rank).map_err(|_| AppError::DatabaseError(format!("Rank out of range: {rank}")))
}

fn entry_from_row(row: &PgRow) -> Result<LeaderboardEntry, AppError> {
    Ok(LeaderboardEntry {
        id: row.get("id"),
        user_id: row.get("user_id"),
        competition_id: row.get("competition_id"),
        total_points: row.get("total_points"),
        total_matches: row.get("total_matches"),
        exact_count: row.get("exact_count"),
        correct_diff_count: row.get("correct_diff_count"),
        correct_winner_count: row.get("correct_winner_count"),
        wrong_count: row.get("wrong_count"),
        current_rank: rank_from_db(row.get("current_rank"))?,
        previous_rank: rank_from_db(row.get("previous_rank"))?,
        rank_change: row.get("rank_change"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| {
        warn!(error = %e, "{}", context);
        AppError::DatabaseError(e.to_string())
    }
}

#[async_trait]
impl LeaderboardRepository for PostgresLeaderboardRepository {
    #[instrument(skip(self))]
    async fn ensure_entry(
        &self,
        user_id: Uuid,
        competition_id: Uuid,
    ) -> Result<LeaderboardEntry, AppError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query(&format!(
            "INSERT INTO leaderboard_entries (user_id, competition_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, competition_id) \
             DO UPDATE SET user_id = EXCLUDED.user_id \
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(user_id)
        .bind(competition_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create or get leaderboard entry"))?;

        entry_from_row(&row)
    }

    #[instrument(skip(self))]
    async fn apply_delta(&self, delta: &AggregateDelta) -> Result<LeaderboardEntry, AppError> {
        let row = sqlx::query(&format!(
            "INSERT INTO leaderboard_entries \
             (user_id, competition_id, total_points, total_matches, \
              exact_count, correct_diff_count, correct_winner_count, wrong_count) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (user_id, competition_id) DO UPDATE SET \
             total_points = leaderboard_entries.total_points + EXCLUDED.total_points, \
             total_matches = leaderboard_entries.total_matches + EXCLUDED.total_matches, \
             exact_count = leaderboard_entries.exact_count + EXCLUDED.exact_count, \
             correct_diff_count = leaderboard_entries.correct_diff_count + EXCLUDED.correct_diff_count, \
             correct_winner_count = leaderboard_entries.correct_winner_count + EXCLUDED.correct_winner_count, \
             wrong_count = leaderboard_entries.wrong_count + EXCLUDED.wrong_count, \
             updated_at = NOW() \
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(delta.user_id)
        .bind(delta.competition_id)
        .bind(delta.points_delta())
        .bind(delta.sign.factor())
        .bind(delta.count_delta(Category::Exact))
        .bind(delta.count_delta(Category::CorrectDiff))
        .bind(delta.count_delta(Category::CorrectWinnerOnly))
        .bind(delta.count_delta(Category::Wrong))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to apply leaderboard delta"))?;

        entry_from_row(&row)
    }

    #[instrument(skip(self))]
    async fn get_entry(
        &self,
        user_id: Uuid,
        competition_id: Uuid,
    ) -> Result<Option<LeaderboardEntry>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM leaderboard_entries WHERE user_id = $1 AND competition_id = $2"
        ))
        .bind(user_id)
        .bind(competition_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch leaderboard entry"))?;

        row.as_ref().map(entry_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn list_entries(&self, competition_id: Uuid) -> Result<Vec<LeaderboardEntry>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM leaderboard_entries WHERE competition_id = $1 ORDER BY id"
        ))
        .bind(competition_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list leaderboard entries"))?;

        rows.iter().map(entry_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn list_competitions(&self) -> Result<Vec<Uuid>, AppError> {
        let rows = sqlx::query(
            "SELECT DISTINCT competition_id FROM leaderboard_entries ORDER BY competition_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list competitions"))?;

        Ok(rows.iter().map(|row| row.get("competition_id")).collect())
    }

    #[instrument(skip(self))]
    async fn latest_snapshot(
        &self,
        competition_id: Uuid,
    ) -> Result<Option<RankSnapshot>, AppError> {
        let run = sqlx::query(
            "SELECT id, taken_at FROM leaderboard_rank_runs \
             WHERE competition_id = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(competition_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch latest rank run"))?;

        let Some(run) = run else {
            return Ok(None);
        };
        let run_id: i64 = run.get("id");
        let taken_at: DateTime<Utc> = run.get("taken_at");

        let rows = sqlx::query("SELECT user_id, rank FROM leaderboard_rank_snapshots WHERE run_id = $1")
            .bind(run_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to fetch rank snapshot"))?;

        let mut ranks: HashMap<Uuid, u32> = HashMap::with_capacity(rows.len());
        for row in &rows {
            let rank: i32 = row.get("rank");
            if let Some(rank) = rank_from_db(Some(rank))? {
                ranks.insert(row.get("user_id"), rank);
            }
        }

        Ok(Some(RankSnapshot {
            competition_id,
            taken_at,
            ranks,
        }))
    }

    #[instrument(skip(self, updates, snapshot))]
    async fn commit_rankings(
        &self,
        competition_id: Uuid,
        updates: &[RankUpdate],
        snapshot: &RankSnapshot,
    ) -> Result<(), AppError> {
        let mut entry_ids = Vec::with_capacity(updates.len());
        let mut current = Vec::with_capacity(updates.len());
        let mut previous = Vec::with_capacity(updates.len());
        let mut changes = Vec::with_capacity(updates.len());
        for update in updates {
            entry_ids.push(update.entry_id);
            current.push(rank_to_db(update.current_rank)?);
            previous.push(update.previous_rank.map(rank_to_db).transpose()?);
            changes.push(update.rank_change);
        }

        let mut snapshot_users = Vec::with_capacity(snapshot.ranks.len());
        let mut snapshot_ranks = Vec::with_capacity(snapshot.ranks.len());
        for (user_id, rank) in &snapshot.ranks {
            snapshot_users.push(*user_id);
            snapshot_ranks.push(rank_to_db(*rank)?);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to open ranking transaction"))?;

        let updated = sqlx::query(
            "UPDATE leaderboard_entries AS e SET \
             current_rank = u.current_rank, previous_rank = u.previous_rank, rank_change = u.rank_change \
             FROM UNNEST($1::bigint[], $2::int[], $3::int[], $4::int[]) \
             AS u(id, current_rank, previous_rank, rank_change) \
             WHERE e.id = u.id AND e.competition_id = $5",
        )
        .bind(&entry_ids)
        .bind(&current)
        .bind(&previous)
        .bind(&changes)
        .bind(competition_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to write ranks"))?;

        if updated.rows_affected() != updates.len() as u64 {
            warn!(
                competition_id = %competition_id,
                expected = updates.len(),
                updated = updated.rows_affected(),
                "Rank update touched an unexpected number of entries, rolling back"
            );
            tx.rollback()
                .await
                .map_err(db_error("Failed to roll back ranking transaction"))?;
            return Err(AppError::DatabaseError(
                "Rank update did not match the leaderboard entries".to_string(),
            ));
        }

        let run = sqlx::query(
            "INSERT INTO leaderboard_rank_runs (competition_id, taken_at) VALUES ($1, $2) RETURNING id",
        )
        .bind(competition_id)
        .bind(snapshot.taken_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to record rank run"))?;
        let run_id: i64 = run.get("id");

        sqlx::query(
            "INSERT INTO leaderboard_rank_snapshots (run_id, user_id, rank) \
             SELECT $1, * FROM UNNEST($2::uuid[], $3::int[])",
        )
        .bind(run_id)
        .bind(&snapshot_users)
        .bind(&snapshot_ranks)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to write rank snapshot"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit rankings"))?;

        debug!(competition_id = %competition_id, run_id, ranked = updates.len(), "Committed rankings to database");
        Ok(())
    }
}
