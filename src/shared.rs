use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::auth::TokenConfig;
use crate::evaluation::{EvaluationEventHandler, MatchEvaluationCoordinator, MatchEventHandler};
use crate::leaderboard::RankRecalculator;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<MatchEvaluationCoordinator>,
    pub recalculator: Arc<RankRecalculator>,
    /// Reacts to match state changes reported by match management
    pub event_handler: Arc<dyn MatchEventHandler>,
    pub token_config: TokenConfig,
}

impl AppState {
    pub fn new(
        coordinator: Arc<MatchEvaluationCoordinator>,
        recalculator: Arc<RankRecalculator>,
        token_config: TokenConfig,
    ) -> Self {
        Self {
            event_handler: Arc::new(EvaluationEventHandler::new(Arc::clone(&coordinator))),
            coordinator,
            recalculator,
            token_config,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::JwtError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            ),
            AppError::InvalidState(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "success": false,
            "error": error_message
        }));

        (status, body).into_response()
    }
}
