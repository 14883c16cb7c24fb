use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{info, instrument, warn};

use crate::shared::{AppError, AppState};

/// Admin-only guard: validates the Authorization Bearer header and requires
/// the admin role, then adds the AdminClaims to the request extensions.
/// Usage: .layer(middleware::from_fn_with_state(app_state.clone(), auth::require_admin))
#[instrument(skip(state, req, next))]
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| {
            warn!(uri = %req.uri(), "Missing Authorization header in admin request");
            AppError::Unauthorized("Missing authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("Invalid Authorization header format (expected Bearer token)");
        AppError::Unauthorized("Invalid authorization header format".to_string())
    })?;

    let claims = state.token_config.validate_token(token)?;
    if !claims.is_admin() {
        warn!(sub = %claims.sub, role = %claims.role, "Non-admin attempted admin action");
        return Err(AppError::Forbidden("Admin role required".to_string()));
    }

    info!(sub = %claims.sub, uri = %req.uri(), "Admin request authorized");
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
