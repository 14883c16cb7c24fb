use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{models::RankingReport, types::StandingResponse};
use crate::shared::{AppError, AppState};

/// HTTP handler for re-ranking one competition on demand (admin only)
///
/// POST /admin/competitions/:competition_id/recompute
#[instrument(name = "recompute_competition", skip(state))]
pub async fn recompute_competition(
    State(state): State<AppState>,
    Path(competition_id): Path<Uuid>,
) -> Result<Json<RankingReport>, AppError> {
    info!(competition_id = %competition_id, "Manual rank recomputation requested");

    let report = state.recalculator.recompute(competition_id).await?;
    Ok(Json(report))
}

/// HTTP handler for reading a competition leaderboard
///
/// GET /competitions/:competition_id/leaderboard
/// Returns entries in rank order
#[instrument(name = "get_standings", skip(state))]
pub async fn get_standings(
    State(state): State<AppState>,
    Path(competition_id): Path<Uuid>,
) -> Result<Json<Vec<StandingResponse>>, AppError> {
    let entries = state.recalculator.standings(competition_id).await?;

    info!(
        competition_id = %competition_id,
        entry_count = entries.len(),
        "Leaderboard listed"
    );

    Ok(Json(entries.into_iter().map(StandingResponse::from).collect()))
}
