use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};

use crate::{errors::AppError, models::Claims, utils::decode_jwt, AppState};

/// Authentication middleware validating JWT access tokens.
///
/// # Errors
/// Returns unauthorized if the token is missing or invalid; rate-limited
/// requests surface as an internal error with a stable message.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;
    let claims: Claims = decode_jwt(token, &state.config)?;
    let user_id = claims.sub;

    // Rate limit key: authenticated user id
    let key = user_id.to_string();
    if state.rate_limiter.check_key(&key).is_err() {
        return Err(AppError::Internal(anyhow::anyhow!("rate limit exceeded")));
    }

    req.extensions_mut().insert(user_id);

    Ok(next.run(req).await)
}
