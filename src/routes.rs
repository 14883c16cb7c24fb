use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::auth::require_admin;
use crate::evaluation::{recalculate_match, receive_match_event};
use crate::leaderboard::{get_standings, recompute_competition};
use crate::shared::AppState;

/// Builds the HTTP surface: admin-guarded recalculation and match event
/// routes plus the public leaderboard read
pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/matches/:match_id/recalculate", post(recalculate_match))
        .route("/matches/:match_id/events", post(receive_match_event))
        .route(
            "/competitions/:competition_id/recompute",
            post(recompute_competition),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/", get(|| async { "puckpicks scoring engine" }))
        .route(
            "/competitions/:competition_id/leaderboard",
            get(get_standings),
        )
        .nest("/admin", admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
