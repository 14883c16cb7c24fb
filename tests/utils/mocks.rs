#![allow(dead_code)] // Test utilities may not all be used in every test

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use puckpicks::{
    leaderboard::{
        AggregateDelta, InMemoryLeaderboardRepository, LeaderboardEntry, LeaderboardRepository,
        RankSnapshot, RankUpdate,
    },
    AppError,
};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// In-memory leaderboard that starts rejecting deltas once a budget of
/// successful writes is spent, until healed. Deltas can also be slowed down.
pub struct FlakyLeaderboardRepository {
    inner: InMemoryLeaderboardRepository,
    write_delay_ms: AtomicU64,
    remaining_writes: AtomicUsize,
    failing: AtomicBool,
    fail_commits: AtomicBool,
}

impl FlakyLeaderboardRepository {
    pub fn new() -> Self {
        Self {
            inner: InMemoryLeaderboardRepository::new(),
            write_delay_ms: AtomicU64::new(0),
            remaining_writes: AtomicUsize::new(usize::MAX),
            failing: AtomicBool::new(false),
            fail_commits: AtomicBool::new(false),
        }
    }

    /// Allow `writes` more deltas, then fail every following one
    pub fn fail_after(&self, writes: usize) {
        self.remaining_writes.store(writes, Ordering::SeqCst);
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Every following delta sleeps this long before it is written
    pub fn slow_writes(&self, delay: Duration) {
        self.write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn fail_rank_commits(&self) {
        self.fail_commits.store(true, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.write_delay_ms.store(0, Ordering::SeqCst);
        self.failing.store(false, Ordering::SeqCst);
        self.fail_commits.store(false, Ordering::SeqCst);
    }

    pub async fn snapshot_count(&self, competition_id: Uuid) -> usize {
        self.inner.snapshot_count(competition_id).await
    }

    fn take_write(&self) -> Result<(), AppError> {
        if !self.failing.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.remaining_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map(|_| ())
            .map_err(|_| AppError::DatabaseError("connection reset".to_string()))
    }
}

#[async_trait]
impl LeaderboardRepository for FlakyLeaderboardRepository {
    async fn ensure_entry(
        &self,
        user_id: Uuid,
        competition_id: Uuid,
    ) -> Result<LeaderboardEntry, AppError> {
        self.inner.ensure_entry(user_id, competition_id).await
    }

    async fn apply_delta(&self, delta: &AggregateDelta) -> Result<LeaderboardEntry, AppError> {
        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.take_write()?;
        self.inner.apply_delta(delta).await
    }

    async fn get_entry(
        &self,
        user_id: Uuid,
        competition_id: Uuid,
    ) -> Result<Option<LeaderboardEntry>, AppError> {
        self.inner.get_entry(user_id, competition_id).await
    }

    async fn list_entries(&self, competition_id: Uuid) -> Result<Vec<LeaderboardEntry>, AppError> {
        self.inner.list_entries(competition_id).await
    }

    async fn list_competitions(&self) -> Result<Vec<Uuid>, AppError> {
        self.inner.list_competitions().await
    }

    async fn latest_snapshot(
        &self,
        competition_id: Uuid,
    ) -> Result<Option<RankSnapshot>, AppError> {
        self.inner.latest_snapshot(competition_id).await
    }

    async fn commit_rankings(
        &self,
        competition_id: Uuid,
        updates: &[RankUpdate],
        snapshot: &RankSnapshot,
    ) -> Result<(), AppError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError("serialization failure".to_string()));
        }
        self.inner
            .commit_rankings(competition_id, updates, snapshot)
            .await
    }
}
