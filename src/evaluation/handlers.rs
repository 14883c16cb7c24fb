use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::events::{MatchEvent, MatchEventError};
use crate::matches::MatchResult;
use crate::shared::{AppError, AppState};

/// Response for a manual match recalculation
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RecalculateResponse {
    pub success: bool,
    pub match_id: Uuid,
    pub found: bool,
    pub reverted: usize,
    pub evaluated: usize,
}

/// HTTP handler for manually re-running a match evaluation (admin only)
///
/// POST /admin/matches/:match_id/recalculate
/// Reverts any previous evaluation, then evaluates the current result
#[instrument(name = "recalculate_match", skip(state))]
pub async fn recalculate_match(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> Result<Json<RecalculateResponse>, AppError> {
    info!(match_id = %match_id, "Manual recalculation requested");

    let report = state.coordinator.reevaluate(match_id).await.map_err(|e| {
        warn!(match_id = %match_id, error = %e, "Manual recalculation failed");
        AppError::from(e)
    })?;

    Ok(Json(RecalculateResponse {
        success: true,
        match_id,
        found: report.found,
        reverted: report.reverted,
        evaluated: report.evaluated,
    }))
}

/// A match as it was before and after a save on the match-management side
#[derive(Debug, Serialize, Deserialize)]
pub struct MatchTransitionRequest {
    /// None when the previous state is unknown
    pub previous: Option<MatchResult>,
    pub current: MatchResult,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MatchEventResponse {
    pub success: bool,
    pub match_id: Uuid,
    /// The event the transition produced, if it affects scoring
    pub event: Option<MatchEvent>,
}

impl From<MatchEventError> for AppError {
    fn from(err: MatchEventError) -> Self {
        match err {
            MatchEventError::Retryable(_) => AppError::Internal,
            MatchEventError::NonRetryable(msg) => AppError::InvalidState(msg),
        }
    }
}

/// HTTP handler for match state changes reported by match management (admin only)
///
/// POST /admin/matches/:match_id/events
/// Finishing or correcting a match re-evaluates it; reopening or cancelling reverts it
#[instrument(name = "receive_match_event", skip(state, request))]
pub async fn receive_match_event(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Json(request): Json<MatchTransitionRequest>,
) -> Result<Json<MatchEventResponse>, AppError> {
    let mismatched = request.current.id != match_id
        || request
            .previous
            .as_ref()
            .is_some_and(|previous| previous.id != match_id);
    if mismatched {
        warn!(match_id = %match_id, "Match transition does not belong to the addressed match");
        return Err(AppError::InvalidState(
            "Match transition does not belong to this match".to_string(),
        ));
    }

    let event = MatchEvent::from_transition(request.previous.as_ref(), &request.current);
    match &event {
        Some(event) => {
            info!(match_id = %match_id, ?event, handler = state.event_handler.name(), "Dispatching match event");
            state.event_handler.handle(event).await?;
        }
        None => info!(match_id = %match_id, "Match transition does not affect scoring"),
    }

    Ok(Json(MatchEventResponse {
        success: true,
        match_id,
        event,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::LeaderboardRepository;
    use crate::matches::{EndingType, MatchStatus};
    use crate::predictions::{Prediction, PredictionRepository, PredictionStatus};
    use crate::routes::router;
    use crate::shared::test_utils::TestApp;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt; // for `oneshot`

    fn recalculate_request(match_id: Uuid, auth: Option<String>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/admin/matches/{match_id}/recalculate"));
        if let Some(auth) = auth {
            builder = builder.header("Authorization", auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_recalculate_match_handler() {
        let app = TestApp::new();
        let m = MatchResult::scheduled(Uuid::new_v4()).finish(3, 1);
        app.matches.save_match(m.clone()).await;
        let p = Prediction::new(Uuid::new_v4(), m.id, 3, 1);
        app.predictions.save_prediction(p.clone()).await;

        let response = router(app.state.clone())
            .oneshot(recalculate_request(m.id, Some(app.admin_bearer())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: RecalculateResponse = serde_json::from_slice(&body).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.evaluated, 1);

        let stored = app.predictions.get_prediction(p.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PredictionStatus::Evaluated);
    }

    #[tokio::test]
    async fn test_recalculate_requires_token() {
        let app = TestApp::new();
        let response = router(app.state.clone())
            .oneshot(recalculate_request(Uuid::new_v4(), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_recalculate_rejects_non_admin() {
        let app = TestApp::new();
        let response = router(app.state.clone())
            .oneshot(recalculate_request(Uuid::new_v4(), Some(app.bearer("user"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_recalculate_tied_match_reports_failure() {
        let app = TestApp::new();
        let m = MatchResult::scheduled(Uuid::new_v4()).finish(2, 2);
        app.matches.save_match(m.clone()).await;

        let response = router(app.state.clone())
            .oneshot(recalculate_request(m.id, Some(app.admin_bearer())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("ambiguous"));
    }

    #[tokio::test]
    async fn test_recalculate_missing_match_succeeds_as_no_op() {
        let app = TestApp::new();
        let response = router(app.state.clone())
            .oneshot(recalculate_request(Uuid::new_v4(), Some(app.admin_bearer())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: RecalculateResponse = serde_json::from_slice(&body).unwrap();
        assert!(!parsed.found);
    }

    fn event_request(app: &TestApp, match_id: Uuid, body: &MatchTransitionRequest) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/admin/matches/{match_id}/events"))
            .header("Authorization", app.admin_bearer())
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(body).unwrap()))
            .unwrap()
    }

    async fn event_response(
        app: &TestApp,
        match_id: Uuid,
        body: &MatchTransitionRequest,
    ) -> (StatusCode, serde_json::Value) {
        let response = router(app.state.clone())
            .oneshot(event_request(app, match_id, body))
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_match_events_drive_evaluation_and_revert() {
        let app = TestApp::new();
        let scheduled = MatchResult::scheduled(Uuid::new_v4());
        let finished = scheduled
            .clone()
            .finish(3, 2)
            .with_ending(EndingType::Overtime);
        app.matches.save_match(finished.clone()).await;
        let user = Uuid::new_v4();
        let p = Prediction::new(user, finished.id, 3, 2);
        app.predictions.save_prediction(p.clone()).await;

        let (status, json) = event_response(
            &app,
            finished.id,
            &MatchTransitionRequest {
                previous: Some(scheduled),
                current: finished.clone(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let parsed: MatchEventResponse = serde_json::from_value(json).unwrap();
        assert_eq!(
            parsed.event,
            Some(MatchEvent::Finished {
                match_id: finished.id
            })
        );

        let entry = app
            .leaderboard
            .get_entry(user, finished.competition_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.total_points, 5);

        let mut reopened = finished.clone();
        reopened.status = MatchStatus::Live;
        app.matches.save_match(reopened.clone()).await;

        let (status, json) = event_response(
            &app,
            finished.id,
            &MatchTransitionRequest {
                previous: Some(finished.clone()),
                current: reopened,
            },
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let parsed: MatchEventResponse = serde_json::from_value(json).unwrap();
        assert_eq!(
            parsed.event,
            Some(MatchEvent::Reopened {
                match_id: finished.id
            })
        );

        let entry = app
            .leaderboard
            .get_entry(user, finished.competition_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.total_points, 0);
        assert_eq!(app.predictions.get_prediction(p.id).await.unwrap(), Some(p));
    }

    #[tokio::test]
    async fn test_transition_without_scoring_effect_is_acknowledged() {
        let app = TestApp::new();
        let scheduled = MatchResult::scheduled(Uuid::new_v4());
        let mut live = scheduled.clone();
        live.status = MatchStatus::Live;

        let (status, json) = event_response(
            &app,
            live.id,
            &MatchTransitionRequest {
                previous: Some(scheduled),
                current: live.clone(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let parsed: MatchEventResponse = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.event, None);
    }

    #[tokio::test]
    async fn test_match_event_for_other_match_is_rejected() {
        let app = TestApp::new();
        let current = MatchResult::scheduled(Uuid::new_v4()).finish(1, 0);

        let (status, json) = event_response(
            &app,
            Uuid::new_v4(),
            &MatchTransitionRequest {
                previous: None,
                current,
            },
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_tied_finish_event_is_rejected() {
        let app = TestApp::new();
        let scheduled = MatchResult::scheduled(Uuid::new_v4());
        let finished = scheduled.clone().finish(2, 2);
        app.matches.save_match(finished.clone()).await;

        let (status, json) = event_response(
            &app,
            finished.id,
            &MatchTransitionRequest {
                previous: Some(scheduled),
                current: finished.clone(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["error"].as_str().unwrap().contains("ambiguous"));
    }
}
